//! System prompt construction.
//!
//! Sections are concatenated in a fixed order, each under a bracketed
//! label, skipping blank ones:
//!
//! 1. `[Character]` — the override if present, else the base prompt
//! 2. `[Personality]`
//! 3. `[Scenario]`
//! 4. `[Example Dialogue]`
//! 5. `[User Persona]`
//!
//! When the whole prompt exceeds its budget it is truncated as one string,
//! never per section.

use hearth_core::{Character, Persona, TokenEstimator};
use tracing::warn;

/// The assembled system prompt and its accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt {
    pub text: String,
    pub tokens: usize,
    pub truncated: bool,
    pub warning: Option<String>,
}

/// Builds the character system prompt. Pure, no I/O.
pub struct SystemPromptBuilder<'a> {
    estimator: &'a dyn TokenEstimator,
    provider: &'a str,
}

impl<'a> SystemPromptBuilder<'a> {
    pub fn new(estimator: &'a dyn TokenEstimator, provider: &'a str) -> Self {
        Self {
            estimator,
            provider,
        }
    }

    /// Concatenate the non-blank sections without any budget applied.
    pub fn compose(character: &Character, persona: Option<&Persona>) -> String {
        let persona_note = persona.map(persona_note).unwrap_or_default();
        let sections = [
            ("Character", character.effective_prompt()),
            ("Personality", character.personality.as_str()),
            ("Scenario", character.scenario.as_str()),
            ("Example Dialogue", character.example_dialogues.as_str()),
            ("User Persona", persona_note.as_str()),
        ];

        sections
            .iter()
            .filter(|(_, body)| !body.trim().is_empty())
            .map(|(label, body)| format!("[{}]\n{}", label, body.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the prompt and truncate it to `budget` if necessary.
    pub fn build(
        &self,
        character: &Character,
        persona: Option<&Persona>,
        budget: usize,
    ) -> SystemPrompt {
        let full = Self::compose(character, persona);
        let tokens = self.estimator.estimate(&full, self.provider);

        if tokens <= budget {
            return SystemPrompt {
                text: full,
                tokens,
                truncated: false,
                warning: None,
            };
        }

        warn!(
            character = %character.name,
            tokens,
            budget,
            "System prompt exceeds budget, truncating"
        );
        let text = self
            .estimator
            .truncate_to_limit(&full, budget, self.provider);
        let truncated_tokens = self.estimator.estimate(&text, self.provider);

        SystemPrompt {
            text,
            tokens: truncated_tokens,
            truncated: true,
            warning: Some(format!(
                "System prompt truncated from {} to {} tokens to fit the {}-token budget",
                tokens, truncated_tokens, budget
            )),
        }
    }
}

fn persona_note(persona: &Persona) -> String {
    let name = persona.name.trim();
    let description = persona.description.trim();
    match (name.is_empty(), description.is_empty()) {
        (true, true) => String::new(),
        (false, true) => format!("The user is {}.", name),
        (true, false) => description.to_string(),
        (false, false) => format!("The user is {}. {}", name, description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::token::HeuristicEstimator;

    fn character() -> Character {
        Character {
            id: "char_1".into(),
            name: "Mara".into(),
            system_prompt: "You are Mara, a lighthouse keeper.".into(),
            system_prompt_override: None,
            personality: "Gruff but kind.".into(),
            scenario: "".into(),
            example_dialogues: "Mara: Storm's coming.".into(),
        }
    }

    #[test]
    fn sections_in_fixed_order_blank_skipped() {
        let persona = Persona {
            name: "Tom".into(),
            description: "A lost sailor.".into(),
        };
        let text = SystemPromptBuilder::compose(&character(), Some(&persona));

        let char_pos = text.find("[Character]").unwrap();
        let pers_pos = text.find("[Personality]").unwrap();
        let dlg_pos = text.find("[Example Dialogue]").unwrap();
        let user_pos = text.find("[User Persona]").unwrap();
        assert!(char_pos < pers_pos && pers_pos < dlg_pos && dlg_pos < user_pos);
        assert!(!text.contains("[Scenario]"));
        assert!(text.contains("The user is Tom. A lost sailor."));
    }

    #[test]
    fn override_replaces_base_prompt() {
        let mut c = character();
        c.system_prompt_override = Some("You are a pirate.".into());
        let text = SystemPromptBuilder::compose(&c, None);
        assert!(text.contains("You are a pirate."));
        assert!(!text.contains("lighthouse"));
    }

    #[test]
    fn fits_untouched() {
        let est = HeuristicEstimator::new();
        let builder = SystemPromptBuilder::new(&est, "openai");
        let prompt = builder.build(&character(), None, 1_000);
        assert!(!prompt.truncated);
        assert!(prompt.warning.is_none());
        assert_eq!(prompt.text, SystemPromptBuilder::compose(&character(), None));
    }

    #[test]
    fn oversized_prompt_truncated_as_a_whole() {
        let est = HeuristicEstimator::new();
        let builder = SystemPromptBuilder::new(&est, "openai");
        let mut c = character();
        c.personality = "Very detailed backstory. ".repeat(50);

        let prompt = builder.build(&c, None, 20);
        assert!(prompt.truncated);
        assert!(prompt.tokens <= 20);
        assert!(prompt.text.starts_with("[Character]\nYou are Mara"));
        assert!(prompt.warning.unwrap().contains("truncated"));
    }

    #[test]
    fn empty_character_yields_empty_prompt() {
        let est = HeuristicEstimator::new();
        let builder = SystemPromptBuilder::new(&est, "openai");
        let prompt = builder.build(&Character::default(), None, 100);
        assert!(prompt.text.is_empty());
        assert_eq!(prompt.tokens, 0);
    }
}
