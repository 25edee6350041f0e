use crate::Error;
use crate::llm::{CompletionRequest, LLM, Role, Turn};
use async_openai::error::OpenAIError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const PROMPT: &str = "Summarize the following conversation:";
const LABEL: &str = "Conversation summarized for brevity: ";
const NOTHING_TO_SUMMARIZE: &str = "No content to summarize.";
const TRUNCATION_MARKER: &str = "...";

pub const DEFAULT_CHAR_CAP: usize = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Summary {
    /// A digest produced by the model, capped to the configured length.
    Digest { body: String, truncated: bool },
    /// There was no non-system content; no request was made.
    NothingToSummarize,
}

impl Summary {
    pub fn is_digest(&self) -> bool {
        matches!(self, Summary::Digest { .. })
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Summary::Digest { body, .. } => write!(f, "{LABEL}{body}"),
            Summary::NothingToSummarize => write!(f, "{NOTHING_TO_SUMMARIZE}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Request error during summarization: {0}")]
    Request(#[source] Error),

    #[error("JSON decode error during summarization: {0}")]
    Decode(#[source] Error),

    #[error("Unexpected error during summarization: {0}")]
    Unexpected(#[source] Error),
}

impl SummarizeError {
    /// Fixed text shown to the user in place of a summary.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            SummarizeError::Request(_) => "Failed to summarize due to a request error.",
            SummarizeError::Decode(_) => "Failed to summarize due to a JSON decode error.",
            SummarizeError::Unexpected(_) => "Failed to summarize due to an unexpected error.",
        }
    }
}

impl From<Error> for SummarizeError {
    fn from(err: Error) -> Self {
        match err {
            Error::Timeout(_)
            | Error::MissingApiKey { .. }
            | Error::OpenaiError(OpenAIError::Reqwest(_))
            | Error::OpenaiError(OpenAIError::ApiError(_))
            | Error::OpenaiError(OpenAIError::StreamError(_)) => SummarizeError::Request(err),
            Error::JsonError(_)
            | Error::LLMResponseError(_)
            | Error::OpenaiError(OpenAIError::JSONDeserialize(_)) => SummarizeError::Decode(err),
            _ => SummarizeError::Unexpected(err),
        }
    }
}

/// Collapses a run of turns into one bounded digest with a single model call.
pub struct Summarizer {
    llm: Arc<dyn LLM + Send + Sync>,
    model: String,
    char_cap: usize,
    timeout: Duration,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LLM + Send + Sync>, model: String) -> Self {
        Self {
            llm,
            model,
            char_cap: DEFAULT_CHAR_CAP,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn char_cap(mut self, char_cap: usize) -> Self {
        self.char_cap = char_cap;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn set_model(&mut self, model: String) {
        self.model = model;
    }

    pub async fn summarize(&self, turns: &[Turn]) -> Result<Summary, SummarizeError> {
        // role attribution is dropped, only the text is joined
        let conversation = turns
            .iter()
            .filter(|turn| turn.role != Role::System)
            .map(|turn| turn.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        if conversation.is_empty() {
            return Ok(Summary::NothingToSummarize);
        }

        let request = [Turn::system(PROMPT), Turn::user(conversation)];

        info!(model = %self.model, chars = request[1].len_chars(), "summarizing conversation");
        let response = tokio::time::timeout(
            self.timeout,
            self.llm.completion(CompletionRequest {
                model: &self.model,
                messages: &request,
            }),
        )
        .await
        .map_err(|_| Error::Timeout(self.timeout))
        .and_then(|res| res)
        .map_err(|e| {
            let err = SummarizeError::from(e);
            warn!(error = %err, "summarization failed");
            err
        })?;

        let (body, truncated) = truncate_chars(&response.content, self.char_cap);
        Ok(Summary::Digest { body, truncated })
    }
}

fn truncate_chars(text: &str, cap: usize) -> (String, bool) {
    match text.char_indices().nth(cap) {
        Some((end, _)) => (format!("{}{TRUNCATION_MARKER}", &text[..end]), true),
        None => (text.to_string(), false),
    }
}
