use crate::history::{Budget, SummarizeError, Summarizer, Summary};
use crate::llm::{Role, Turn, total_chars};
use tracing::{debug, info, warn};

/// Outcome of checking a conversation against its budget.
#[derive(Debug)]
pub enum Enforcement {
    WithinBudget(Vec<Turn>),
    Summarized {
        turns: Vec<Turn>,
        summary: Summary,
    },
    /// Summarization failed; the turns are returned unreduced.
    Degraded {
        turns: Vec<Turn>,
        error: SummarizeError,
    },
}

impl Enforcement {
    pub fn turns(&self) -> &[Turn] {
        match self {
            Enforcement::WithinBudget(turns)
            | Enforcement::Summarized { turns, .. }
            | Enforcement::Degraded { turns, .. } => turns,
        }
    }

    pub fn into_turns(self) -> Vec<Turn> {
        match self {
            Enforcement::WithinBudget(turns)
            | Enforcement::Summarized { turns, .. }
            | Enforcement::Degraded { turns, .. } => turns,
        }
    }

    /// True when the model actually produced a digest.
    pub fn summarized(&self) -> bool {
        matches!(self, Enforcement::Summarized { summary, .. } if summary.is_digest())
    }
}

/// Keeps a conversation under its budget by folding non-system turns into a summary.
pub struct LengthMonitor {
    summarizer: Summarizer,
    budget: Budget,
    system_role: Role,
}

impl LengthMonitor {
    pub fn new(summarizer: Summarizer, budget: Budget) -> Self {
        Self {
            summarizer,
            budget,
            system_role: Role::System,
        }
    }

    pub fn system_role(mut self, role: Role) -> Self {
        self.system_role = role;
        self
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    pub fn summarizer_mut(&mut self) -> &mut Summarizer {
        &mut self.summarizer
    }

    pub async fn enforce(&self, turns: Vec<Turn>) -> Enforcement {
        let total = total_chars(&turns);
        let limit = self.budget.char_limit();

        if total <= limit {
            debug!(total, limit, "conversation within budget");
            return Enforcement::WithinBudget(turns);
        }

        info!(total, limit, turns = turns.len(), "conversation over budget");
        let (system, rest): (Vec<Turn>, Vec<Turn>) = turns
            .iter()
            .cloned()
            .partition(|turn| turn.role == self.system_role);

        match self.summarizer.summarize(&rest).await {
            Ok(summary) => {
                let mut reduced = system;
                reduced.push(Turn::user(summary.to_string()));
                Enforcement::Summarized {
                    turns: reduced,
                    summary,
                }
            }
            Err(error) => {
                warn!(%error, "keeping unreduced conversation");
                Enforcement::Degraded { turns, error }
            }
        }
    }
}
