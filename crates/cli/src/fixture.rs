//! JSON chat fixtures: one chat with its character, history and memories.
//!
//! ```json
//! {
//!   "provider": "openai",
//!   "model": "gpt-4o",
//!   "character": { "id": "mara", "name": "Mara", "systemPrompt": "..." },
//!   "persona": { "name": "Tom", "description": "A lost sailor." },
//!   "chat": { "id": "chat-1", "characterId": "mara", "title": "New Chat" },
//!   "events": [ { "role": "user", "content": "Hello" } ],
//!   "memories": [ { "characterId": "mara", "summary": "...", "importance": 0.8 } ]
//! }
//! ```

use anyhow::Context;
use hearth_core::{Character, ChatEvent, ChatMetadata, ChatStore, Persona};
use hearth_storage::{InMemoryChatStore, InMemoryMemoryStore, StoredMemory};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    /// Conversational model provider (config default when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub character: Character,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,

    pub chat: ChatMetadata,

    #[serde(default)]
    pub events: Vec<ChatEvent>,

    #[serde(default)]
    pub memories: Vec<StoredMemory>,
}

/// Fixture contents loaded into in-memory stores.
pub struct Loaded {
    pub chats: Arc<InMemoryChatStore>,
    pub memories: Arc<InMemoryMemoryStore>,
}

impl Fixture {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let fixture: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing fixture {}", path.display()))?;
        if fixture.chat.character_id != fixture.character.id {
            anyhow::bail!(
                "fixture chat belongs to character '{}' but the character is '{}'",
                fixture.chat.character_id,
                fixture.character.id
            );
        }
        Ok(fixture)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing fixture {}", path.display()))
    }

    /// Seed fresh in-memory stores with the fixture's chat and memories.
    pub async fn load_stores(&self) -> Loaded {
        let chats = InMemoryChatStore::new();
        chats.insert_chat(self.chat.clone(), self.events.clone()).await;

        let memories = InMemoryMemoryStore::new();
        for memory in &self.memories {
            memories.store(memory.clone()).await;
        }

        Loaded {
            chats: Arc::new(chats),
            memories: Arc::new(memories),
        }
    }

    /// Pull the chat and its history back out of the store.
    pub async fn refresh_from(&mut self, store: &InMemoryChatStore) -> anyhow::Result<()> {
        let id = self.chat.id.clone();
        self.chat = store
            .find_by_id(&id)
            .await?
            .with_context(|| format!("chat {id} vanished from the store"))?;
        self.events = store.get_messages(&id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "character": { "id": "mara", "name": "Mara", "systemPrompt": "You are Mara." },
        "chat": { "id": "chat-1", "characterId": "mara", "title": "New Chat" },
        "events": [
            { "role": "user", "content": "Hello" },
            { "role": "assistant", "content": "Evening." }
        ],
        "memories": [ { "characterId": "mara", "summary": "Tom likes tea", "importance": 0.7 } ]
    }"#;

    #[test]
    fn minimal_fixture_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{MINIMAL}").unwrap();

        let fixture = Fixture::load(file.path()).unwrap();
        assert_eq!(fixture.events.len(), 2);
        assert!(fixture.persona.is_none());
        assert_eq!(fixture.memories[0].summary, "Tom likes tea");
    }

    #[test]
    fn mismatched_character_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", MINIMAL.replace("\"characterId\": \"mara\", \"title\"", "\"characterId\": \"other\", \"title\"")).unwrap();
        assert!(Fixture::load(file.path()).is_err());
    }

    #[tokio::test]
    async fn stores_seeded_and_refreshed() {
        let mut fixture: Fixture = serde_json::from_str(MINIMAL).unwrap();
        let loaded = fixture.load_stores().await;
        assert_eq!(loaded.memories.count().await, 1);

        loaded
            .chats
            .add_message("chat-1", ChatEvent::user("Again"))
            .await
            .unwrap();
        fixture.refresh_from(&loaded.chats).await.unwrap();
        assert_eq!(fixture.events.len(), 3);
        assert_eq!(fixture.chat.message_count, 3);
    }
}
