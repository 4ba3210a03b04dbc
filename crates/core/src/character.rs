//! Character and persona definitions that feed the system prompt.

use serde::{Deserialize, Serialize};

/// A character card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,

    /// Base system prompt.
    #[serde(default)]
    pub system_prompt: String,

    /// Replaces `system_prompt` when present and non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,

    #[serde(default)]
    pub personality: String,

    #[serde(default)]
    pub scenario: String,

    #[serde(default)]
    pub example_dialogues: String,
}

impl Character {
    /// The override if set and non-blank, otherwise the base prompt.
    pub fn effective_prompt(&self) -> &str {
        match self.system_prompt_override.as_deref() {
            Some(o) if !o.trim().is_empty() => o,
            _ => &self.system_prompt,
        }
    }
}

/// The user's persona within a chat.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_when_present() {
        let mut c = Character {
            system_prompt: "base".into(),
            ..Default::default()
        };
        assert_eq!(c.effective_prompt(), "base");

        c.system_prompt_override = Some("  ".into());
        assert_eq!(c.effective_prompt(), "base");

        c.system_prompt_override = Some("override".into());
        assert_eq!(c.effective_prompt(), "override");
    }
}
