//! Chat metadata and the storage trait.
//!
//! Chats are created and owned by the storage collaborator. The context
//! engine only ever touches three fields (`context_summary`, `title`,
//! `last_rename_check_interchange`) plus the `updated_at` stamp, always
//! through a partial [`ChatUpdate`].

use crate::error::StorageError;
use crate::message::ChatEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored metadata for a single chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetadata {
    pub id: String,

    /// The character this chat is held with.
    pub character_id: String,

    /// Owning user, forwarded to memory search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    pub title: String,

    /// Rolling conversation summary, if one has been generated.
    #[serde(default)]
    pub context_summary: Option<String>,

    /// Number of `message` events in the chat.
    #[serde(default)]
    pub message_count: usize,

    /// Interchange count at which the title was last reconsidered.
    #[serde(default)]
    pub last_rename_check_interchange: usize,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ChatMetadata {
    /// Create a fresh chat with no summary and no title checks.
    pub fn new(
        id: impl Into<String>,
        character_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            character_id: character_id.into(),
            user_id: None,
            title: title.into(),
            context_summary: None,
            message_count: 0,
            last_rename_check_interchange: 0,
            updated_at: Utc::now(),
        }
    }

    /// The stored summary, treating an empty string as absent.
    pub fn summary(&self) -> Option<&str> {
        self.context_summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}

/// A partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatUpdate {
    pub title: Option<String>,
    pub context_summary: Option<String>,
    pub last_rename_check_interchange: Option<usize>,
}

impl ChatUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.context_summary.is_none()
            && self.last_rename_check_interchange.is_none()
    }

    /// Apply the update in place and stamp `updated_at`.
    pub fn apply_to(&self, chat: &mut ChatMetadata) {
        if let Some(title) = &self.title {
            chat.title = title.clone();
        }
        if let Some(summary) = &self.context_summary {
            chat.context_summary = Some(summary.clone());
        }
        if let Some(interchange) = self.last_rename_check_interchange {
            chat.last_rename_check_interchange = interchange;
        }
        chat.updated_at = Utc::now();
    }
}

/// Chat persistence as seen by the context engine.
///
/// Implementations are expected to serialize concurrent writes to the same chat.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Look up a chat by ID.
    async fn find_by_id(&self, chat_id: &str) -> Result<Option<ChatMetadata>, StorageError>;

    /// Apply a partial update, returning the stored chat afterwards.
    async fn update(&self, chat_id: &str, update: ChatUpdate)
    -> Result<ChatMetadata, StorageError>;

    /// All events of a chat in chronological order.
    async fn get_messages(&self, chat_id: &str) -> Result<Vec<ChatEvent>, StorageError>;

    /// Append an event to a chat's history.
    async fn add_message(&self, chat_id: &str, event: ChatEvent) -> Result<(), StorageError>;
}
