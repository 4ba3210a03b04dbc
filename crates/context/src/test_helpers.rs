//! Shared test doubles for the context and background tests.

use async_trait::async_trait;
use hearth_core::error::{GenerationError, MemoryError};
use hearth_core::{
    CheapGenerator, CheapTask, Generation, MemorySearch, MemorySearchOptions, ScoredMemory, Usage,
};
use std::sync::Mutex;

type Reply = (Option<&'static str>, Result<String, GenerationError>);

/// A cheap generator that returns scripted replies.
///
/// Each call takes the first queued reply that is either unkeyed or keyed
/// to the task's [`CheapTask::kind`]. Runs out with an `Api` error.
pub struct ScriptedGenerator {
    replies: Mutex<Vec<Reply>>,
    tasks: Mutex<Vec<CheapTask>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| (None, r)).collect()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Successful replies, in call order.
    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// Successful replies keyed by task kind, for passes that race.
    pub fn by_kind(replies: &[(&'static str, &str)]) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .iter()
                    .map(|(kind, text)| (Some(*kind), Ok(text.to_string())))
                    .collect(),
            ),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Tasks received so far, in call order.
    pub fn tasks(&self) -> Vec<CheapTask> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheapGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, task: CheapTask) -> Result<Generation, GenerationError> {
        let kind = task.kind();
        self.tasks.lock().unwrap().push(task);

        let mut replies = self.replies.lock().unwrap();
        let Some(pos) = replies
            .iter()
            .position(|(key, _)| key.is_none_or(|k| k == kind))
        else {
            return Err(GenerationError::Api {
                status_code: 500,
                message: format!("no scripted reply left for {kind}"),
            });
        };

        let (_, reply) = replies.remove(pos);
        reply.map(|text| Generation {
            text,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }
}

/// Memory search that always returns the same candidates.
pub struct FixedMemorySearch {
    memories: Vec<ScoredMemory>,
}

impl FixedMemorySearch {
    pub fn new(memories: Vec<ScoredMemory>) -> Self {
        Self { memories }
    }
}

#[async_trait]
impl MemorySearch for FixedMemorySearch {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search(
        &self,
        _character_id: &str,
        _query: &str,
        options: &MemorySearchOptions,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        Ok(self.memories.iter().take(options.limit).cloned().collect())
    }
}

/// Memory search whose backend is always down.
pub struct FailingMemorySearch;

#[async_trait]
impl MemorySearch for FailingMemorySearch {
    fn name(&self) -> &str {
        "failing"
    }

    async fn search(
        &self,
        _character_id: &str,
        _query: &str,
        _options: &MemorySearchOptions,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        Err(MemoryError::SearchFailed("vector index unavailable".into()))
    }
}
