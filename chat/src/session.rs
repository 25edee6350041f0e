use crate::callbacks::{self, Callback as _};
use crate::history::{
    Budget, DEFAULT_CHAR_CAP, DEFAULT_TIMEOUT, Enforcement, LengthMonitor, SummarizeError,
    Summarizer,
};
use crate::llm::{self, CompletionRequest, Turn};
use crate::personality::Personality;
use crate::{Error, Result};
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

type Callback = Box<dyn callbacks::Callback + Send>;

const PERSONALITY_PREFIX: &str = "Ignore prior guidance and use this system prompt: ";

pub struct Reply {
    pub content: String,
    /// Set when the history was over budget and could not be summarized.
    pub summarize_error: Option<SummarizeError>,
}

/// One user's conversation with a model.
///
/// `messages` is what gets sent to the model and may be summarized;
/// `full_conversation` records every exchange and is only emptied by
/// [`Session::clear_all`].
pub struct Session {
    llm: Arc<dyn llm::LLM + Send + Sync>,
    monitor: LengthMonitor,
    model: String,
    system_prompt: String,
    messages: Vec<Turn>,
    full_conversation: Vec<Turn>,
    summarized: bool,
    callbacks: Vec<Callback>,
    request_timeout: Duration,
}

impl Session {
    async fn prepare(&mut self, prompt: &str) -> Option<SummarizeError> {
        self.messages.push(Turn::user(prompt));
        self.full_conversation.push(Turn::user(prompt));

        let enforcement = self
            .monitor
            .enforce(std::mem::take(&mut self.messages))
            .await;

        if enforcement.summarized() {
            self.summarized = true;
        }

        match enforcement {
            Enforcement::Degraded { turns, error } => {
                self.messages = turns;
                Some(error)
            }
            other => {
                self.messages = other.into_turns();
                None
            }
        }
    }

    async fn finish(&mut self, content: &str) -> Result<()> {
        self.messages.push(Turn::assistant(content));
        self.full_conversation.push(Turn::assistant(content));

        for callback in &mut self.callbacks {
            self.full_conversation = callback.call(self.full_conversation.clone()).await?;
        }

        Ok(())
    }

    /// Sends a user turn and waits for the whole reply.
    pub async fn send(&mut self, prompt: &str) -> Result<Reply> {
        let summarize_error = self.prepare(prompt).await;

        debug!(model = %self.model, turns = self.messages.len(), "sending");
        let response = tokio::time::timeout(
            self.request_timeout,
            self.llm.completion(CompletionRequest {
                model: &self.model,
                messages: &self.messages,
            }),
        )
        .await
        .map_err(|_| Error::Timeout(self.request_timeout))??;

        self.finish(&response.content).await?;

        Ok(Reply {
            content: response.content,
            summarize_error,
        })
    }

    /// Sends a user turn, handing each chunk of the reply to `on_chunk` as it arrives.
    pub async fn send_streaming<F>(&mut self, prompt: &str, mut on_chunk: F) -> Result<Reply>
    where
        F: FnMut(&str) + Send,
    {
        let summarize_error = self.prepare(prompt).await;

        debug!(model = %self.model, turns = self.messages.len(), "streaming");
        let mut stream = tokio::time::timeout(
            self.request_timeout,
            self.llm.completion_stream(CompletionRequest {
                model: &self.model,
                messages: &self.messages,
            }),
        )
        .await
        .map_err(|_| Error::Timeout(self.request_timeout))??;

        let mut content = String::new();
        // each chunk gets the full timeout so a stalled stream cannot hang the session
        while let Some(chunk) = tokio::time::timeout(self.request_timeout, stream.next())
            .await
            .map_err(|_| Error::Timeout(self.request_timeout))?
        {
            let chunk = chunk?;
            on_chunk(&chunk);
            content.push_str(&chunk);
        }

        self.finish(&content).await?;

        Ok(Reply {
            content,
            summarize_error,
        })
    }

    /// Switches the system prompt mid-conversation.
    pub fn update_personality(&mut self, system_prompt: &str) {
        self.system_prompt = system_prompt.to_string();
        self.messages
            .push(Turn::system(format!("{PERSONALITY_PREFIX}{system_prompt}")));
    }

    /// Forgets what the model has seen, keeping the recorded conversation.
    pub fn clear_memory(&mut self) {
        self.messages = vec![Turn::system(self.system_prompt.clone())];
    }

    /// Forgets everything, including the recorded conversation.
    pub fn clear_all(&mut self) {
        self.clear_memory();
        self.full_conversation.clear();
        self.summarized = false;
        info!("conversation cleared");
    }

    pub fn set_model(&mut self, model: String) {
        self.monitor.summarizer_mut().set_model(model.clone());
        self.model = model;
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn budget(&self) -> Budget {
        self.monitor.budget()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn messages(&self) -> &[Turn] {
        &self.messages
    }

    pub fn full_conversation(&self) -> &[Turn] {
        &self.full_conversation
    }

    /// Whether older turns have been replaced by a summary at some point.
    pub fn summarized(&self) -> bool {
        self.summarized
    }

    pub fn transcript(&self) -> String {
        callbacks::render_transcript(&self.full_conversation)
    }

    pub fn transcript_html(&self) -> String {
        callbacks::render_transcript_html(&self.full_conversation)
    }

    pub fn save_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.full_conversation)?;
        Ok(())
    }
}

pub struct SessionBuilder {
    llm: Option<Arc<dyn llm::LLM + Send + Sync>>,
    model: Option<String>,
    system_prompt: String,
    budget: Budget,
    summary_char_cap: usize,
    request_timeout: Duration,
    callbacks: Vec<Callback>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            llm: None,
            model: None,
            system_prompt: Personality::default().system_prompt().to_string(),
            budget: Budget::default(),
            summary_char_cap: DEFAULT_CHAR_CAP,
            request_timeout: DEFAULT_TIMEOUT,
            callbacks: Vec::new(),
        }
    }

    pub fn llm(mut self, llm: Arc<dyn llm::LLM + Send + Sync>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn personality(mut self, personality: Personality) -> Self {
        self.system_prompt = personality.system_prompt().to_string();
        self
    }

    pub fn system_prompt(mut self, system_prompt: String) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn summary_char_cap(mut self, summary_char_cap: usize) -> Self {
        self.summary_char_cap = summary_char_cap;
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn callback(mut self, callback: Callback) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn build(self) -> Result<Session> {
        let llm = self
            .llm
            .ok_or(Error::MissingArg("llm is required for session".to_string()))?;
        let model = self
            .model
            .ok_or(Error::MissingArg("model is required for session".to_string()))?;

        let summarizer = Summarizer::new(llm.clone(), model.clone())
            .char_cap(self.summary_char_cap)
            .timeout(self.request_timeout);

        Ok(Session {
            llm,
            monitor: LengthMonitor::new(summarizer, self.budget),
            model,
            system_prompt: self.system_prompt,
            messages: Vec::new(),
            full_conversation: Vec::new(),
            summarized: false,
            callbacks: self.callbacks,
            request_timeout: self.request_timeout,
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
