//! Cheap generation trait — the small model behind summaries and titles.
//!
//! Distinct from the main conversational LLM call: it is only ever used by
//! background housekeeping (conversation summaries and chat titles).

use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Longest title the engine will persist.
pub const MAX_TITLE_CHARS: usize = 80;

/// A housekeeping task for the cheap model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum CheapTask {
    /// Summarize an entire conversation from scratch.
    Summarize { transcript: String },

    /// Fold recent messages into an existing summary.
    UpdateSummary {
        previous_summary: String,
        recent_transcript: String,
    },

    /// Derive a chat title from a summary.
    TitleFromSummary { summary: String },

    /// Decide whether the current title still fits the conversation.
    ReconsiderTitle {
        current_title: String,
        recent_transcript: String,
        context: String,
    },
}

impl CheapTask {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            CheapTask::Summarize { .. } => "summarize",
            CheapTask::UpdateSummary { .. } => "update_summary",
            CheapTask::TitleFromSummary { .. } => "title_from_summary",
            CheapTask::ReconsiderTitle { .. } => "reconsider_title",
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A successful cheap generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Outcome of a title reconsideration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleVerdict {
    pub rename: bool,
    #[serde(default)]
    pub title: Option<String>,
}

impl TitleVerdict {
    /// Parse the model's answer: a JSON object `{"rename": bool, "title": "..."}`,
    /// optionally wrapped in a code fence or surrounded by prose.
    pub fn parse(output: &str) -> Result<Self, GenerationError> {
        let trimmed = output.trim();
        let json = match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => {
                return Err(GenerationError::InvalidOutput(format!(
                    "expected a JSON verdict, got: {trimmed}"
                )));
            }
        };

        let mut verdict: TitleVerdict = serde_json::from_str(json)
            .map_err(|e| GenerationError::InvalidOutput(e.to_string()))?;

        verdict.title = verdict.title.as_deref().and_then(clean_title);
        if verdict.title.is_none() {
            verdict.rename = false;
        }
        Ok(verdict)
    }
}

/// Normalize a model-suggested title: first line, quotes and trailing
/// punctuation stripped, capped at [`MAX_TITLE_CHARS`]. Blank titles yield `None`.
pub fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.strip_prefix("Title:").unwrap_or(line).trim();
    let line = line
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`')
        .trim_end_matches(['.', ':'])
        .trim();
    if line.is_empty() {
        return None;
    }
    Some(line.chars().take(MAX_TITLE_CHARS).collect())
}

/// The cheap text-generation collaborator.
#[async_trait]
pub trait CheapGenerator: Send + Sync {
    /// The generator name (e.g., "openai", "scripted").
    fn name(&self) -> &str;

    /// Run a housekeeping task.
    async fn generate(&self, task: CheapTask) -> Result<Generation, GenerationError>;
}
