//! In-memory chat store — useful for testing and fixture-driven runs.

use async_trait::async_trait;
use hearth_core::error::StorageError;
use hearth_core::{ChatEvent, ChatMetadata, ChatStore, ChatUpdate};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct ChatRecord {
    metadata: ChatMetadata,
    events: Vec<ChatEvent>,
}

/// Chats and their event histories, kept in a map behind one lock.
///
/// Writes to a chat are serialized by the write lock.
#[derive(Clone, Default)]
pub struct InMemoryChatStore {
    chats: Arc<RwLock<HashMap<String, ChatRecord>>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a chat with its history.
    ///
    /// `message_count` is recomputed from `events`.
    pub async fn insert_chat(&self, mut chat: ChatMetadata, events: Vec<ChatEvent>) {
        chat.message_count = events.iter().filter(|e| e.is_message()).count();
        let id = chat.id.clone();
        self.chats.write().await.insert(
            id,
            ChatRecord {
                metadata: chat,
                events,
            },
        );
    }

    /// Remove a chat, returning whether it existed.
    pub async fn remove_chat(&self, chat_id: &str) -> bool {
        self.chats.write().await.remove(chat_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.chats.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chats.read().await.is_empty()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn find_by_id(&self, chat_id: &str) -> Result<Option<ChatMetadata>, StorageError> {
        Ok(self
            .chats
            .read()
            .await
            .get(chat_id)
            .map(|r| r.metadata.clone()))
    }

    async fn update(
        &self,
        chat_id: &str,
        update: ChatUpdate,
    ) -> Result<ChatMetadata, StorageError> {
        let mut chats = self.chats.write().await;
        let record = chats
            .get_mut(chat_id)
            .ok_or_else(|| StorageError::ChatNotFound(chat_id.to_string()))?;
        update.apply_to(&mut record.metadata);
        debug!(chat_id, ?update, "Chat updated");
        Ok(record.metadata.clone())
    }

    async fn get_messages(&self, chat_id: &str) -> Result<Vec<ChatEvent>, StorageError> {
        self.chats
            .read()
            .await
            .get(chat_id)
            .map(|r| r.events.clone())
            .ok_or_else(|| StorageError::ChatNotFound(chat_id.to_string()))
    }

    async fn add_message(&self, chat_id: &str, event: ChatEvent) -> Result<(), StorageError> {
        let mut chats = self.chats.write().await;
        let record = chats
            .get_mut(chat_id)
            .ok_or_else(|| StorageError::ChatNotFound(chat_id.to_string()))?;
        if event.is_message() {
            record.metadata.message_count += 1;
        }
        record.events.push(event);
        Ok(())
    }
}
