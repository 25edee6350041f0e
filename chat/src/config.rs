//! Session configuration with the defaults the chat front-end ships with.

use std::sync::Arc;
use std::time::Duration;

use crate::history::{Budget, DEFAULT_CHAR_CAP, DEFAULT_TIMEOUT};
use crate::llm::{self, LLM, Router};
use crate::personality::Personality;
use crate::session::SessionBuilder;

/// Settings for one chat session.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model identifier, also used for summarization. Default: `"llama3-70b-8192"`.
    pub model: String,
    /// System prompt preset. Default: [`Personality::Regular`].
    pub personality: Personality,
    /// Size at which older turns are summarized. Default: 7000 tokens.
    pub budget: Budget,
    /// Maximum summary length in characters. Default: `1000`.
    pub summary_char_cap: usize,
    /// Sampling temperature. Default: `0.5`.
    pub temperature: f32,
    /// Maximum tokens per response. Default: `1000`.
    pub max_tokens: u32,
    /// Upper bound on every buffered model call. Default: 60s.
    pub request_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "llama3-70b-8192".to_string(),
            personality: Personality::default(),
            budget: Budget::default(),
            summary_char_cap: DEFAULT_CHAR_CAP,
            temperature: llm::DEFAULT_TEMPERATURE,
            max_tokens: llm::DEFAULT_MAX_TOKENS,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ChatConfig {
    /// A provider router with every client whose api key is present.
    pub fn router(&self) -> Router {
        Router::from_env(self.temperature, self.max_tokens)
    }

    /// A [`SessionBuilder`] carrying these settings; add callbacks and build.
    pub fn session_builder(&self, llm: Arc<dyn LLM + Send + Sync>) -> SessionBuilder {
        SessionBuilder::new()
            .llm(llm)
            .model(self.model.clone())
            .personality(self.personality)
            .budget(self.budget)
            .summary_char_cap(self.summary_char_cap)
            .request_timeout(self.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionRequest, CompletionResponse};
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl LLM for Silent {
        async fn completion<'a>(
            &self,
            _request: CompletionRequest<'a>,
        ) -> crate::Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: String::new(),
            })
        }
    }

    #[test]
    fn defaults_match_the_front_end() {
        let config = ChatConfig::default();
        assert_eq!(config.model, "llama3-70b-8192");
        assert_eq!(config.personality, Personality::Regular);
        assert_eq!(config.budget.char_limit(), 28_000);
        assert_eq!(config.summary_char_cap, 1000);
        assert!((config.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.max_tokens, 1000);
    }

    #[test]
    fn session_builder_applies_settings() -> crate::Result<()> {
        let config = ChatConfig {
            model: "gpt-4o".to_string(),
            personality: Personality::Expert,
            budget: Budget::Chars(500),
            ..ChatConfig::default()
        };

        let session = config.session_builder(Arc::new(Silent)).build()?;

        assert_eq!(session.model(), "gpt-4o");
        assert_eq!(session.budget(), Budget::Chars(500));
        assert_eq!(session.system_prompt(), Personality::Expert.system_prompt());
        assert!(session.messages().is_empty());
        Ok(())
    }
}
