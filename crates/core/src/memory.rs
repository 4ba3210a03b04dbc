//! Memory search trait — scored recall of long-term character memories.
//!
//! The context engine never stores memories itself. It asks an external
//! search backend for candidates relevant to the incoming user message and
//! ranks whatever comes back.

use crate::error::MemoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A memory candidate returned by a search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMemory {
    /// One-line summary of the memory.
    pub summary: String,

    /// How important the memory was judged at write time (0.0–1.0).
    pub importance: f32,

    /// Relevance score for the current query.
    pub score: f32,
}

impl ScoredMemory {
    pub fn new(summary: impl Into<String>, importance: f32, score: f32) -> Self {
        Self {
            summary: summary.into(),
            importance,
            score,
        }
    }
}

/// Options forwarded to a memory search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySearchOptions {
    /// Restrict results to memories formed with this user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Maximum number of candidates.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Minimum importance threshold.
    #[serde(default)]
    pub min_importance: f32,
}

fn default_limit() -> usize {
    10
}

impl Default for MemorySearchOptions {
    fn default() -> Self {
        Self {
            user_id: None,
            limit: default_limit(),
            min_importance: 0.0,
        }
    }
}

/// Semantic memory search.
///
/// Implementations: in-memory keyword store (testing), no-op.
#[async_trait]
pub trait MemorySearch: Send + Sync {
    /// The backend name (e.g., "in_memory", "none").
    fn name(&self) -> &str;

    /// Search a character's memories for candidates relevant to `query`.
    async fn search(
        &self,
        character_id: &str,
        query: &str,
        options: &MemorySearchOptions,
    ) -> Result<Vec<ScoredMemory>, MemoryError>;
}
