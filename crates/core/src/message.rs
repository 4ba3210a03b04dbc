//! Message and chat event domain types.
//!
//! Two shapes flow through the system:
//! - [`ChatEvent`]: what the chat store persists (conversational messages
//!   plus bookkeeping markers such as context summaries).
//! - [`ContextMessage`]: what the assembler emits for a single LLM call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (character, memories, summary)
    System,
    /// The end user
    User,
    /// The character / assistant
    Assistant,
}

impl Role {
    /// Transcript label used when rendering conversations for cheap generation.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// Per-message bookkeeping attached by the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    /// Whether the content was injected by the assembler rather than typed by a participant.
    pub is_injected: bool,
    /// Estimated token cost of this message.
    pub token_count: usize,
}

/// A single message in an assembled LLM request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl ContextMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attach assembler metadata.
    pub fn with_metadata(mut self, is_injected: bool, token_count: usize) -> Self {
        self.metadata = Some(MessageMetadata {
            is_injected,
            token_count,
        });
        self
    }
}

/// The kind of a persisted chat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// A conversational turn from the user or the character.
    Message,
    /// Audit marker written whenever a conversation summary is regenerated.
    ContextSummary,
}

/// A persisted entry in a chat's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    #[serde(default = "new_event_id")]
    pub id: String,
    #[serde(rename = "type", default = "default_event_kind")]
    pub kind: EventKind,
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn new_event_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_event_kind() -> EventKind {
    EventKind::Message
}

impl ChatEvent {
    /// Create a conversational message event.
    pub fn message(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_event_id(),
            kind: EventKind::Message,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::message(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::message(Role::Assistant, content)
    }

    /// Create a `context-summary` marker carrying the freshly generated summary.
    pub fn context_summary(summary: impl Into<String>) -> Self {
        Self {
            id: new_event_id(),
            kind: EventKind::ContextSummary,
            role: Role::System,
            content: summary.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether this event is a conversational message.
    pub fn is_message(&self) -> bool {
        self.kind == EventKind::Message
    }

    /// Whether this event is a user or assistant message (excludes markers and system notes).
    pub fn is_turn(&self) -> bool {
        self.is_message() && matches!(self.role, Role::User | Role::Assistant)
    }
}

/// Render conversational turns as a plain `Role: content` transcript.
pub fn render_transcript<'a>(events: impl IntoIterator<Item = &'a ChatEvent>) -> String {
    events
        .into_iter()
        .filter(|e| e.is_turn())
        .map(|e| format!("{}: {}", e.role.label(), e.content))
        .collect::<Vec<_>>()
        .join("\n")
}
