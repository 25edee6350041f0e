use crate::Error;

const ESSAYIST_PROMPT: &str = include_str!("prompts/essayist.md");
const REGULAR_PROMPT: &str = include_str!("prompts/regular.md");
const EXPERT_PROMPT: &str = include_str!("prompts/expert.md");

/// Bundled system prompts a user can pick from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Personality {
    Essayist,
    #[default]
    Regular,
    Expert,
}

impl Personality {
    pub const ALL: [Personality; 3] = [
        Personality::Essayist,
        Personality::Regular,
        Personality::Expert,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Personality::Essayist => "essayist",
            Personality::Regular => "regular",
            Personality::Expert => "expert",
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            Personality::Essayist => ESSAYIST_PROMPT.trim_end(),
            Personality::Regular => REGULAR_PROMPT.trim_end(),
            Personality::Expert => EXPERT_PROMPT.trim_end(),
        }
    }
}

impl std::str::FromStr for Personality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Personality::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(Error::UnknownPersonality(s.to_string()))
    }
}

impl std::fmt::Display for Personality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Expert".parse::<Personality>().unwrap(), Personality::Expert);
        assert_eq!(" regular ".parse::<Personality>().unwrap(), Personality::Regular);
        assert!(matches!(
            "pirate".parse::<Personality>(),
            Err(Error::UnknownPersonality(name)) if name == "pirate"
        ));
    }

    #[test]
    fn bundled_prompts_are_loaded() {
        assert_eq!(
            Personality::Regular.system_prompt(),
            "You are a helpful assistant."
        );
        assert!(Personality::Expert.system_prompt().starts_with("# Enhanced Assistant Guidance"));
        assert!(Personality::Essayist.system_prompt().contains("essay"));
    }
}
