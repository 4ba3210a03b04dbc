//! In-memory memory store with keyword-overlap relevance.
//!
//! Stands in for a semantic (embedding) search in tests and fixture runs.
//! The score is the fraction of distinct query keywords found in a
//! memory's summary, so it lands in `[0, 1]` like a cosine similarity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_core::error::MemoryError;
use hearth_core::{MemorySearch, MemorySearchOptions, ScoredMemory};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Words shorter than this are ignored when matching.
const MIN_KEYWORD_LEN: usize = 3;

/// A memory as stored, before scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMemory {
    #[serde(default)]
    pub id: String,
    pub character_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub summary: String,
    /// 0.0 to 1.0.
    pub importance: f32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl StoredMemory {
    pub fn new(character_id: impl Into<String>, summary: impl Into<String>, importance: f32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            character_id: character_id.into(),
            user_id: None,
            summary: summary.into(),
            importance,
            created_at: Utc::now(),
        }
    }
}

/// A memory store that keeps everything in a Vec.
#[derive(Clone, Default)]
pub struct InMemoryMemoryStore {
    entries: Arc<RwLock<Vec<StoredMemory>>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a memory, assigning an id if it has none.
    pub async fn store(&self, mut memory: StoredMemory) -> String {
        if memory.id.is_empty() {
            memory.id = Uuid::new_v4().to_string();
        }
        let id = memory.id.clone();
        self.entries.write().await.push(memory);
        id
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of `query` keywords present in `summary`.
pub fn keyword_overlap(query: &str, summary: &str) -> f32 {
    let wanted = keywords(query);
    if wanted.is_empty() {
        return 0.0;
    }
    let present = keywords(summary);
    let hits = wanted.iter().filter(|w| present.contains(*w)).count();
    hits as f32 / wanted.len() as f32
}

#[async_trait]
impl MemorySearch for InMemoryMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(
        &self,
        character_id: &str,
        query: &str,
        options: &MemorySearchOptions,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        let entries = self.entries.read().await;

        let mut results: Vec<ScoredMemory> = entries
            .iter()
            .filter(|m| m.character_id == character_id)
            .filter(|m| match (&options.user_id, &m.user_id) {
                (Some(wanted), Some(owner)) => wanted == owner,
                _ => true,
            })
            .filter(|m| m.importance >= options.min_importance)
            .map(|m| {
                ScoredMemory::new(
                    m.summary.clone(),
                    m.importance,
                    keyword_overlap(query, &m.summary),
                )
            })
            .filter(|m| m.score > 0.0)
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(options.limit);

        Ok(results)
    }
}
