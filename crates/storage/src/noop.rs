//! No-op memory search — disables memory recall entirely.

use async_trait::async_trait;
use hearth_core::error::MemoryError;
use hearth_core::{MemorySearch, MemorySearchOptions, ScoredMemory};

/// A memory search that never finds anything.
pub struct NoopMemorySearch;

#[async_trait]
impl MemorySearch for NoopMemorySearch {
    fn name(&self) -> &str {
        "none"
    }

    async fn search(
        &self,
        _character_id: &str,
        _query: &str,
        _options: &MemorySearchOptions,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        Ok(Vec::new())
    }
}
