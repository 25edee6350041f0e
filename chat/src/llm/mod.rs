use crate::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::pin::Pin;

mod openai;
mod provider;
pub use openai::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, OpenAI};
pub use provider::{Provider, Router};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Length of the content in characters, not bytes.
    pub fn len_chars(&self) -> usize {
        self.content.chars().count()
    }

    pub fn get_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Role-agnostic sum of content lengths.
pub fn total_chars(turns: &[Turn]) -> usize {
    turns.iter().map(Turn::len_chars).sum()
}

pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Turn],
}

pub struct CompletionResponse {
    pub content: String,
}

pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[async_trait]
pub trait LLM {
    async fn completion<'a>(&self, request: CompletionRequest<'a>) -> Result<CompletionResponse>;

    /// Streams the reply as text chunks. Providers without native streaming
    /// yield the buffered completion as a single chunk.
    async fn completion_stream<'a>(&self, request: CompletionRequest<'a>) -> Result<TextStream> {
        let response = self.completion(request).await?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok(response.content)
        })))
    }
}
