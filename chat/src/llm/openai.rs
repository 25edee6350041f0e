use crate::llm;
use crate::{Error, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, Role,
    },
};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Client for any OpenAI-compatible chat completions endpoint.
pub struct OpenAI {
    client: Client<OpenAIConfig>,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAI {
    pub fn new(api_base: &str, api_key: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(api_base)
            .with_api_key(api_key);

        Self {
            client: Client::with_config(config),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(
        &self,
        request: &llm::CompletionRequest<'_>,
        stream: bool,
    ) -> Result<CreateChatCompletionRequest> {
        let completion = CreateChatCompletionRequestArgs::default()
            .model(request.model)
            .messages(
                request
                    .messages
                    .iter()
                    .map(ChatCompletionRequestMessage::from)
                    .collect::<Vec<_>>(),
            )
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .stream(stream)
            .build()?;

        Ok(completion)
    }
}

impl From<&llm::Turn> for ChatCompletionRequestMessage {
    fn from(turn: &llm::Turn) -> Self {
        match turn.role {
            llm::Role::User => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(turn.content.clone()),
                    name: None,
                })
            }
            llm::Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(turn.content.clone()),
                    name: None,
                })
            }
            llm::Role::Assistant => {
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        turn.content.clone(),
                    )),
                    ..Default::default()
                })
            }
        }
    }
}

#[async_trait]
impl llm::LLM for OpenAI {
    async fn completion<'a>(
        &self,
        request: llm::CompletionRequest<'a>,
    ) -> Result<llm::CompletionResponse> {
        let completion = self.build_request(&request, false)?;

        debug!(model = request.model, turns = request.messages.len(), "chat completion");
        let res = self.client.chat().create(completion).await?;

        let choice = res
            .choices
            .first()
            .ok_or(Error::LLMResponseError("choices is empty".to_string()))?;

        if choice.message.role != Role::Assistant {
            return Err(Error::LLMResponseError(
                "expected role to be assistant".to_string(),
            ));
        }

        let content = choice
            .message
            .content
            .as_ref()
            .ok_or(Error::LLMResponseError("content is empty".to_string()))?;

        Ok(llm::CompletionResponse {
            content: content.clone(),
        })
    }

    async fn completion_stream<'a>(
        &self,
        request: llm::CompletionRequest<'a>,
    ) -> Result<llm::TextStream> {
        let completion = self.build_request(&request, true)?;

        debug!(model = request.model, turns = request.messages.len(), "streaming chat completion");
        let stream = self.client.chat().create_stream(completion).await?;

        Ok(Box::pin(stream.filter_map(|chunk| async move {
            match chunk {
                Ok(chunk) => chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .filter(|text| !text.is_empty())
                    .map(Ok),
                Err(e) => Some(Err(Error::from(e))),
            }
        })))
    }
}
