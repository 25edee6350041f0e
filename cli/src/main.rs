mod repl;

use chat::history::Budget;
use chat::llm::Provider;
use chat::{ChatConfig, Personality, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Chat with an OpenAI, Groq or OpenRouter model from the terminal.
///
/// Api keys are read from OPENAI_API_KEY, GROQ_API_KEY and OPENROUTER_API_KEY.
#[derive(Parser)]
#[command(name = "chat")]
struct Cli {
    /// Model to talk to; unknown ids are sent to OpenRouter [default: llama3-70b-8192]
    #[arg(long, env = "CHAT_MODEL")]
    model: Option<String>,

    /// System prompt preset: essayist, regular or expert [default: regular]
    #[arg(long)]
    personality: Option<Personality>,

    /// Summarize once the history exceeds this many tokens, 4 chars each [default: 7000]
    #[arg(long, conflicts_with = "budget_chars")]
    budget_tokens: Option<usize>,

    /// Summarize once the history exceeds this many characters
    #[arg(long)]
    budget_chars: Option<usize>,

    /// Maximum summary length in characters [default: 1000]
    #[arg(long)]
    summary_cap: Option<usize>,

    /// Give up on a model call after this many seconds [default: 60]
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Wait for whole replies instead of streaming them
    #[arg(long)]
    no_stream: bool,

    /// Append the conversation to this markdown file as it happens
    #[arg(long)]
    log: Option<std::path::PathBuf>,
}

impl Cli {
    /// Flags that were given override [`ChatConfig::default`].
    fn config(&self) -> ChatConfig {
        let mut config = ChatConfig::default();
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(personality) = self.personality {
            config.personality = personality;
        }
        if let Some(tokens) = self.budget_tokens {
            config.budget = Budget::Tokens(tokens);
        }
        if let Some(chars) = self.budget_chars {
            config.budget = Budget::Chars(chars);
        }
        if let Some(cap) = self.summary_cap {
            config.summary_char_cap = cap;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let router = config.router();
    let provider = Provider::for_model(&config.model);
    if !router.has(provider) {
        warn!(
            model = %config.model,
            provider = provider.name(),
            "{} is not set, requests will fail",
            provider.key_var()
        );
    }

    let mut builder = config.session_builder(Arc::new(router));
    if let Some(path) = &cli.log {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        builder = builder.callback(chat::callbacks::TranscriptLogger::new(
            "Conversation",
            file,
        )?);
    }

    let mut session = builder.build()?;
    // start from the personality prompt
    session.clear_memory();

    repl::run(session, !cli.no_stream).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("chat").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn unset_flags_keep_default_config() {
        let config = parse(&["--model", "llama3-70b-8192"]).config();
        let defaults = ChatConfig::default();

        assert_eq!(config.model, defaults.model);
        assert_eq!(config.personality, defaults.personality);
        assert_eq!(config.budget, defaults.budget);
        assert_eq!(config.summary_char_cap, defaults.summary_char_cap);
        assert_eq!(config.request_timeout, defaults.request_timeout);
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--model",
            "gpt-4o",
            "--personality",
            "expert",
            "--budget-chars",
            "500",
            "--summary-cap",
            "200",
            "--timeout-secs",
            "5",
        ])
        .config();

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.personality, Personality::Expert);
        assert_eq!(config.budget, Budget::Chars(500));
        assert_eq!(config.summary_char_cap, 200);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn token_and_char_budgets_conflict() {
        let parsed = Cli::try_parse_from(["chat", "--budget-tokens", "10", "--budget-chars", "40"]);

        assert!(parsed.is_err());
    }
}
