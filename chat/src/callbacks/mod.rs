use crate::Result;
use crate::llm::{Role, Turn};
use async_trait::async_trait;
use pulldown_cmark::{Options, Parser, html};

mod logger;
pub use logger::TranscriptLogger;

const USER_AVATAR: &str = "👩‍⚕️";
const ASSISTANT_AVATAR: &str = "🤓";

/// Runs after every completed exchange with the full conversation record.
#[async_trait]
pub trait Callback {
    async fn call(&mut self, turns: Vec<Turn>) -> Result<Vec<Turn>>;
}

pub(crate) fn render_turn(turn: &Turn) -> Option<String> {
    match turn.role {
        Role::System => None,
        Role::User => Some(format!("{USER_AVATAR}: {}", turn.content)),
        Role::Assistant => Some(format!("{ASSISTANT_AVATAR}: {}", turn.content)),
    }
}

/// Markdown rendering of a conversation for download. System turns are left out.
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .filter_map(render_turn)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The markdown transcript rendered as an HTML fragment, tables included.
pub fn render_transcript_html(turns: &[Turn]) -> String {
    let markdown = render_transcript(turns);
    let parser = Parser::new_ext(&markdown, Options::ENABLE_TABLES);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
