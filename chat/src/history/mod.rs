mod monitor;
mod summarizer;

pub use monitor::{Enforcement, LengthMonitor};
pub use summarizer::{DEFAULT_CHAR_CAP, DEFAULT_TIMEOUT, SummarizeError, Summarizer, Summary};

const CHARS_PER_TOKEN: usize = 4;

/// Maximum aggregate size of a conversation before it is summarized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Budget {
    /// Approximate tokens, counted as four characters each.
    Tokens(usize),
    Chars(usize),
}

impl Budget {
    pub fn char_limit(self) -> usize {
        match self {
            Budget::Tokens(tokens) => tokens.saturating_mul(CHARS_PER_TOKEN),
            Budget::Chars(chars) => chars,
        }
    }
}

impl Default for Budget {
    fn default() -> Self {
        Budget::Tokens(7000)
    }
}
