use async_openai::error::OpenAIError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Openai error: {0}")]
    OpenaiError(#[from] OpenAIError),

    #[error("No response from llm: {0}")]
    LLMResponseError(String),

    #[error("Missing api key for {provider}: set {var}")]
    MissingApiKey {
        provider: &'static str,
        var: &'static str,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Missing arg: {0}")]
    MissingArg(String),

    #[error("Unknown personality: {0}")]
    UnknownPersonality(String),

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}
