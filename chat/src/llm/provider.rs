use crate::llm::{CompletionRequest, CompletionResponse, LLM, OpenAI, TextStream};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAI,
    Groq,
    OpenRouter,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAI, Provider::Groq, Provider::OpenRouter];

    /// Models served directly by OpenAI or Groq; everything else goes through OpenRouter.
    pub fn for_model(model: &str) -> Self {
        match model {
            "llama3-70b-8192" => Provider::Groq,
            "gpt-4o" | "gpt-3.5-turbo" | "gpt-4-turbo" => Provider::OpenAI,
            _ => Provider::OpenRouter,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Groq => "groq",
            Provider::OpenRouter => "openrouter",
        }
    }

    pub fn api_base(self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    pub fn key_var(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Groq => "GROQ_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

/// Dispatches each request to the provider serving its model.
pub struct Router {
    clients: HashMap<Provider, Box<dyn LLM + Send + Sync>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    pub fn with_client(mut self, provider: Provider, client: Box<dyn LLM + Send + Sync>) -> Self {
        self.clients.insert(provider, client);
        self
    }

    /// Builds one client per provider whose api key is set in the environment.
    pub fn from_env(temperature: f32, max_tokens: u32) -> Self {
        let mut router = Self::new();
        for provider in Provider::ALL {
            if let Ok(key) = std::env::var(provider.key_var()) {
                info!(provider = provider.name(), "configured provider");
                router = router.with_client(
                    provider,
                    Box::new(
                        OpenAI::new(provider.api_base(), &key)
                            .with_temperature(temperature)
                            .with_max_tokens(max_tokens),
                    ),
                );
            }
        }
        router
    }

    /// Whether requests for `provider`'s models can be served.
    pub fn has(&self, provider: Provider) -> bool {
        self.clients.contains_key(&provider)
    }

    fn client(&self, model: &str) -> Result<&(dyn LLM + Send + Sync)> {
        let provider = Provider::for_model(model);
        self.clients
            .get(&provider)
            .map(|client| client.as_ref())
            .ok_or(Error::MissingApiKey {
                provider: provider.name(),
                var: provider.key_var(),
            })
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLM for Router {
    async fn completion<'a>(&self, request: CompletionRequest<'a>) -> Result<CompletionResponse> {
        self.client(request.model)?.completion(request).await
    }

    async fn completion_stream<'a>(&self, request: CompletionRequest<'a>) -> Result<TextStream> {
        self.client(request.model)?.completion_stream(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Turn;

    struct Named(&'static str);

    #[async_trait]
    impl LLM for Named {
        async fn completion<'a>(
            &self,
            _request: CompletionRequest<'a>,
        ) -> Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: self.0.to_string(),
            })
        }
    }

    #[test]
    fn models_route_to_their_provider() {
        assert_eq!(Provider::for_model("llama3-70b-8192"), Provider::Groq);
        assert_eq!(Provider::for_model("gpt-4o"), Provider::OpenAI);
        assert_eq!(Provider::for_model("gpt-4-turbo"), Provider::OpenAI);
        assert_eq!(
            Provider::for_model("anthropic/claude-3-haiku"),
            Provider::OpenRouter
        );
    }

    #[tokio::test]
    async fn router_dispatches_by_model() -> Result<()> {
        let router = Router::new()
            .with_client(Provider::Groq, Box::new(Named("groq")))
            .with_client(Provider::OpenRouter, Box::new(Named("openrouter")));
        let turns = [Turn::user("hi")];

        let groq = router
            .completion(CompletionRequest {
                model: "llama3-70b-8192",
                messages: &turns,
            })
            .await?;
        let other = router
            .completion(CompletionRequest {
                model: "google/gemini-pro",
                messages: &turns,
            })
            .await?;

        assert_eq!(groq.content, "groq");
        assert_eq!(other.content, "openrouter");
        assert!(router.has(Provider::Groq));
        assert!(!router.has(Provider::OpenAI));
        Ok(())
    }

    #[tokio::test]
    async fn missing_provider_reports_key_variable() {
        let router = Router::new();
        let turns = [Turn::user("hi")];

        let err = router
            .completion(CompletionRequest {
                model: "gpt-4o",
                messages: &turns,
            })
            .await
            .err();

        assert!(matches!(
            err,
            Some(Error::MissingApiKey { var: "OPENAI_API_KEY", .. })
        ));
    }
}
