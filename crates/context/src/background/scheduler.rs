//! Background task scheduling for chat housekeeping.
//!
//! One [`BackgroundScheduler`] is constructed at the application root and
//! shared. It tracks state per chat rather than process-wide:
//!
//! - **Per-chat serialization**: both passes for a chat take the same async
//!   mutex, so their read-modify-write cycles on `title` never interleave.
//!   Whichever pass runs second sees the first one's writes.
//! - **In-flight guard**: a summarization request for a chat whose
//!   summarization is already queued or running is dropped.
//! - **Central failure reporting**: pass errors are logged with chat id and
//!   task kind, and counted. Nothing propagates to the request path.

use super::summarization::SummarizationScheduler;
use super::title::TitleScheduler;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Which background pass a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Summarization,
    Title,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Summarization => write!(f, "summarization"),
            TaskKind::Title => write!(f, "title"),
        }
    }
}

/// Counters since the scheduler was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub spawned: usize,
    pub failed: usize,
    /// Summarization requests dropped by the in-flight guard.
    pub deduplicated: usize,
}

#[derive(Default)]
struct SchedulerState {
    chat_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    summarizing: Mutex<HashSet<String>>,
    spawned: AtomicUsize,
    failures: AtomicUsize,
    deduplicated: AtomicUsize,
}

impl SchedulerState {
    fn chat_lock(&self, chat_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.chat_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(chat_id.to_string()).or_default().clone()
    }

    /// Drop the chat's lock once no task holds or waits on it.
    fn release_chat_lock(&self, chat_id: &str) {
        let mut locks = self.chat_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(chat_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(chat_id);
        }
    }

    fn report_failure(&self, kind: TaskKind, chat_id: &str, err: &dyn fmt::Display) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        warn!(task = %kind, chat_id, error = %err, "Background task failed");
    }
}

/// Marks a chat's summarization as in flight until dropped.
struct InFlight {
    state: Arc<SchedulerState>,
    chat_id: String,
}

impl InFlight {
    fn begin(state: &Arc<SchedulerState>, chat_id: &str) -> Option<Self> {
        let mut running = state.summarizing.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(chat_id.to_string()) {
            return None;
        }
        Some(Self {
            state: state.clone(),
            chat_id: chat_id.to_string(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.state
            .summarizing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.chat_id);
    }
}

/// Run `pass` while holding the chat's lock.
async fn serialized<T>(state: &SchedulerState, chat_id: &str, pass: impl Future<Output = T>) -> T {
    let result = {
        let lock = state.chat_lock(chat_id);
        let _guard = lock.lock().await;
        pass.await
    };
    state.release_chat_lock(chat_id);
    result
}

/// Handles to the passes spawned for one turn.
///
/// Dropping this detaches the tasks; they still run to completion.
pub struct TurnTasks {
    handles: Vec<(TaskKind, JoinHandle<()>)>,
    state: Arc<SchedulerState>,
}

impl TurnTasks {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn kinds(&self) -> Vec<TaskKind> {
        self.handles.iter().map(|(kind, _)| *kind).collect()
    }

    /// Wait for every pass to finish. A panicked pass counts as a failure.
    pub async fn wait(self) {
        for (kind, handle) in self.handles {
            if let Err(e) = handle.await {
                self.state.failures.fetch_add(1, Ordering::Relaxed);
                error!(task = %kind, error = %e, "Background task panicked");
            }
        }
    }
}

/// Owns the housekeeping passes and runs them off the request path.
pub struct BackgroundScheduler {
    summarizer: Arc<SummarizationScheduler>,
    titles: Arc<TitleScheduler>,
    state: Arc<SchedulerState>,
}

impl BackgroundScheduler {
    pub fn new(summarizer: SummarizationScheduler, titles: TitleScheduler) -> Self {
        Self {
            summarizer: Arc::new(summarizer),
            titles: Arc::new(titles),
            state: Arc::new(SchedulerState::default()),
        }
    }

    pub fn summarizer(&self) -> &SummarizationScheduler {
        &self.summarizer
    }

    pub fn titles(&self) -> &TitleScheduler {
        &self.titles
    }

    /// Launch both passes for a chat after a completed turn. Returns at once.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn after_turn(&self, chat_id: &str, provider: &str, model: &str) -> TurnTasks {
        let mut handles = Vec::with_capacity(2);
        if let Some(handle) = self.spawn_summarization(chat_id, provider, model) {
            handles.push((TaskKind::Summarization, handle));
        }
        handles.push((TaskKind::Title, self.spawn_title(chat_id)));
        TurnTasks {
            handles,
            state: self.state.clone(),
        }
    }

    /// Spawn a summarization pass, or `None` if one is already in flight for the chat.
    pub fn spawn_summarization(
        &self,
        chat_id: &str,
        provider: &str,
        model: &str,
    ) -> Option<JoinHandle<()>> {
        let Some(in_flight) = InFlight::begin(&self.state, chat_id) else {
            self.state.deduplicated.fetch_add(1, Ordering::Relaxed);
            debug!(chat_id, "Summarization already in flight, skipping");
            return None;
        };

        let summarizer = self.summarizer.clone();
        let state = self.state.clone();
        let chat_id = chat_id.to_string();
        let provider = provider.to_string();
        let model = model.to_string();
        self.state.spawned.fetch_add(1, Ordering::Relaxed);

        Some(tokio::spawn(async move {
            let _in_flight = in_flight;
            let pass = summarizer.maybe_summarize(&chat_id, &provider, &model);
            match serialized(&state, &chat_id, pass).await {
                Ok(outcome) => debug!(chat_id = %chat_id, ?outcome, "Summarization pass finished"),
                Err(e) => state.report_failure(TaskKind::Summarization, &chat_id, &e),
            }
        }))
    }

    /// Spawn a title pass.
    pub fn spawn_title(&self, chat_id: &str) -> JoinHandle<()> {
        let titles = self.titles.clone();
        let state = self.state.clone();
        let chat_id = chat_id.to_string();
        self.state.spawned.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            let pass = titles.maybe_rename(&chat_id);
            match serialized(&state, &chat_id, pass).await {
                Ok(outcome) => debug!(chat_id = %chat_id, ?outcome, "Title pass finished"),
                Err(e) => state.report_failure(TaskKind::Title, &chat_id, &e),
            }
        })
    }

    /// Number of passes that ended in an error (or panicked and were awaited).
    pub fn failure_count(&self) -> usize {
        self.state.failures.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            spawned: self.state.spawned.load(Ordering::Relaxed),
            failed: self.failure_count(),
            deduplicated: self.state.deduplicated.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::summarization::SummarizationSettings;
    use crate::background::title::TitleSettings;
    use crate::context::budget::{BudgetCalculator, ModelProfile, ModelTable};
    use crate::context::token::HeuristicEstimator;
    use crate::test_helpers::ScriptedGenerator;
    use hearth_core::error::GenerationError;
    use hearth_core::{ChatEvent, ChatMetadata, ChatStore, CheapGenerator};
    use hearth_storage::InMemoryChatStore;

    fn long_exchanges(n: usize) -> Vec<ChatEvent> {
        (0..n)
            .flat_map(|i| {
                [
                    ChatEvent::user(format!("long question {i} ").repeat(15)),
                    ChatEvent::assistant(format!("long answer {i} ").repeat(15)),
                ]
            })
            .collect()
    }

    fn scheduler(
        store: Arc<InMemoryChatStore>,
        generator: Option<Arc<ScriptedGenerator>>,
    ) -> BackgroundScheduler {
        let generator = generator.map(|g| g as Arc<dyn CheapGenerator>);
        let table = ModelTable::empty();
        table.set("test/tiny", ModelProfile::new(1_000));
        let summarizer = SummarizationScheduler::new(
            store.clone(),
            generator.clone(),
            Arc::new(HeuristicEstimator::new()),
            Arc::new(BudgetCalculator::new(table)),
            SummarizationSettings::default(),
        );
        let titles = TitleScheduler::new(store, generator, TitleSettings::default());
        BackgroundScheduler::new(summarizer, titles)
    }

    #[tokio::test]
    async fn after_turn_runs_both_passes() {
        let store = Arc::new(InMemoryChatStore::new());
        store
            .insert_chat(ChatMetadata::new("c1", "char1", "New Chat"), long_exchanges(2))
            .await;
        let generator = Arc::new(ScriptedGenerator::replies(&[
            r#"{"rename": true, "title": "Long Questions"}"#,
        ]));
        let sched = scheduler(store.clone(), Some(generator.clone()));

        let tasks = sched.after_turn("c1", "test", "tiny");
        assert_eq!(tasks.kinds(), vec![TaskKind::Summarization, TaskKind::Title]);
        tasks.wait().await;

        // Short chat: summarization below threshold, title checkpoint at 2
        assert_eq!(generator.call_count(), 1);
        let saved = store.find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(saved.title, "Long Questions");
        assert_eq!(saved.last_rename_check_interchange, 2);
        assert_eq!(sched.failure_count(), 0);
        assert_eq!(sched.stats().spawned, 2);
    }

    #[tokio::test]
    async fn summary_and_title_writes_do_not_interleave() {
        let store = Arc::new(InMemoryChatStore::new());
        store
            .insert_chat(ChatMetadata::new("c1", "char1", "New Chat"), long_exchanges(20))
            .await;
        let generator = Arc::new(ScriptedGenerator::by_kind(&[
            ("summarize", "A long exchange of questions."),
            ("title_from_summary", "Questions Galore"),
            ("reconsider_title", r#"{"rename": false}"#),
        ]));
        let sched = scheduler(store.clone(), Some(generator.clone()));

        sched.after_turn("c1", "test", "tiny").wait().await;

        assert_eq!(sched.failure_count(), 0);
        assert_eq!(generator.call_count(), 3);
        let saved = store.find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(saved.summary(), Some("A long exchange of questions."));
        assert_eq!(saved.title, "Questions Galore");
        assert_eq!(saved.last_rename_check_interchange, 20);
    }

    #[tokio::test]
    async fn failures_reported_centrally() {
        let store = Arc::new(InMemoryChatStore::new());
        store
            .insert_chat(ChatMetadata::new("c1", "char1", "New Chat"), long_exchanges(2))
            .await;
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(
            GenerationError::AuthenticationFailed("bad key".into()),
        )]));
        let sched = scheduler(store.clone(), Some(generator));

        sched.after_turn("c1", "test", "tiny").wait().await;
        assert_eq!(sched.failure_count(), 1);

        let saved = store.find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(saved.title, "New Chat");
    }

    #[tokio::test]
    async fn unknown_chat_counts_as_failure() {
        let store = Arc::new(InMemoryChatStore::new());
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let sched = scheduler(store, Some(generator));

        sched.after_turn("ghost", "test", "tiny").wait().await;
        assert_eq!(sched.failure_count(), 2);
    }

    #[tokio::test]
    async fn missing_generator_is_not_a_failure() {
        let store = Arc::new(InMemoryChatStore::new());
        store
            .insert_chat(ChatMetadata::new("c1", "char1", "New Chat"), long_exchanges(20))
            .await;
        let sched = scheduler(store, None);

        sched.after_turn("c1", "test", "tiny").wait().await;
        assert_eq!(sched.failure_count(), 0);
    }

    #[tokio::test]
    async fn second_summarization_for_same_chat_is_dropped() {
        let store = Arc::new(InMemoryChatStore::new());
        store
            .insert_chat(ChatMetadata::new("c1", "char1", "New Chat"), long_exchanges(2))
            .await;
        let sched = scheduler(store, Some(Arc::new(ScriptedGenerator::new(vec![]))));

        // Hold the chat lock so the first pass cannot finish
        let lock = sched.state.chat_lock("c1");
        let guard = lock.lock().await;

        let first = sched.spawn_summarization("c1", "test", "tiny");
        assert!(first.is_some());
        assert!(sched.spawn_summarization("c1", "test", "tiny").is_none());
        // Other chats are unaffected
        let other = sched.spawn_summarization("c2", "test", "tiny");
        assert!(other.is_some());

        drop(guard);
        drop(lock);
        first.unwrap().await.unwrap();
        other.unwrap().await.unwrap();

        assert_eq!(sched.stats().deduplicated, 1);
        assert!(sched.spawn_summarization("c1", "test", "tiny").is_some());
    }

    #[tokio::test]
    async fn chat_locks_released_after_passes() {
        let store = Arc::new(InMemoryChatStore::new());
        store
            .insert_chat(ChatMetadata::new("c1", "char1", "New Chat"), long_exchanges(1))
            .await;
        let sched = scheduler(store, None);

        sched.after_turn("c1", "test", "tiny").wait().await;
        let locks = sched.state.chat_locks.lock().unwrap();
        assert!(locks.is_empty());
    }
}
