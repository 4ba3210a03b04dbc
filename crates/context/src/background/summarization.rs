//! Rolling conversation summaries.
//!
//! Per chat, the summary moves through three states:
//!
//! ```text
//! NoSummary ──(trigger)──▶ Fresh ──(recheck_interval messages)──▶ Stale ──(trigger)──▶ Fresh
//! ```
//!
//! The trigger is computed on demand from the chat history and the model
//! window; nothing about it is stored. A fresh summary short-circuits
//! re-evaluation until enough new messages have arrived.
//!
//! Regeneration is incremental when a summary exists (prior summary plus
//! the last `incremental_window` messages), falling back to a full pass if
//! the incremental call fails. On success the summary is persisted, a
//! `context-summary` marker is appended to the history, and a title is
//! derived from the new summary (title failures are logged only).

use super::SkipReason;
use crate::context::budget::BudgetCalculator;
use hearth_config::SummarizationConfig;
use hearth_core::error::{GenerationError, StorageError};
use hearth_core::generation::clean_title;
use hearth_core::{
    ChatEvent, ChatMetadata, ChatStore, ChatUpdate, CheapGenerator, CheapTask, EventKind, Result,
    TokenEstimator, render_transcript,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// When a conversation is large enough to need a summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryTrigger {
    /// Message count that must be exceeded.
    pub min_messages: usize,
    /// Fraction of the context window the history must exceed.
    pub token_ratio: f32,
}

impl SummaryTrigger {
    /// `message_count > min_messages` and `estimated_tokens / context_limit > token_ratio`.
    pub fn needs_summarizing(
        &self,
        message_count: usize,
        estimated_tokens: usize,
        context_limit: usize,
    ) -> bool {
        if context_limit == 0 {
            return false;
        }
        let ratio = estimated_tokens as f64 / context_limit as f64;
        message_count > self.min_messages && ratio > f64::from(self.token_ratio)
    }
}

impl Default for SummaryTrigger {
    fn default() -> Self {
        Self {
            min_messages: 20,
            token_ratio: 0.5,
        }
    }
}

impl From<&SummarizationConfig> for SummaryTrigger {
    fn from(config: &SummarizationConfig) -> Self {
        Self {
            min_messages: config.min_messages,
            token_ratio: config.token_ratio,
        }
    }
}

/// Summarization tunables.
#[derive(Debug, Clone)]
pub struct SummarizationSettings {
    pub enabled: bool,
    pub trigger: SummaryTrigger,
    /// New messages required before an existing summary is re-evaluated.
    pub recheck_interval: usize,
    /// Messages fed to an incremental update.
    pub incremental_window: usize,
}

impl Default for SummarizationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger: SummaryTrigger::default(),
            recheck_interval: 10,
            incremental_window: 20,
        }
    }
}

impl From<&SummarizationConfig> for SummarizationSettings {
    fn from(config: &SummarizationConfig) -> Self {
        Self {
            enabled: config.enabled,
            trigger: SummaryTrigger::from(config),
            recheck_interval: config.recheck_interval,
            incremental_window: config.incremental_window,
        }
    }
}

/// Where a chat's summary stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryState {
    NoSummary,
    /// Summary exists and few messages have arrived since.
    Fresh,
    /// Summary exists and enough messages arrived to re-evaluate.
    Stale,
}

impl SummaryState {
    pub fn of(chat: &ChatMetadata, events: &[ChatEvent], recheck_interval: usize) -> Self {
        if chat.summary().is_none() {
            SummaryState::NoSummary
        } else if messages_since_last_summary(events) < recheck_interval {
            SummaryState::Fresh
        } else {
            SummaryState::Stale
        }
    }
}

/// Message events after the most recent `context-summary` marker
/// (all of them when there is no marker).
pub fn messages_since_last_summary(events: &[ChatEvent]) -> usize {
    events
        .iter()
        .rev()
        .take_while(|e| e.kind != EventKind::ContextSummary)
        .filter(|e| e.is_message())
        .count()
}

/// How a summary was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMode {
    /// Whole conversation, no prior summary used.
    Full,
    /// Prior summary plus the recent window.
    Incremental,
    /// Incremental update failed, whole conversation used instead.
    FallbackFull,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Skipped(SkipReason),
    Summarized {
        mode: SummaryMode,
        summary: String,
        /// Title derived from the summary, if one was saved.
        title: Option<String>,
    },
}

/// Decides when to summarize a chat and keeps the summary current.
pub struct SummarizationScheduler {
    store: Arc<dyn ChatStore>,
    generator: Option<Arc<dyn CheapGenerator>>,
    estimator: Arc<dyn TokenEstimator>,
    budgets: Arc<BudgetCalculator>,
    settings: SummarizationSettings,
}

impl SummarizationScheduler {
    pub fn new(
        store: Arc<dyn ChatStore>,
        generator: Option<Arc<dyn CheapGenerator>>,
        estimator: Arc<dyn TokenEstimator>,
        budgets: Arc<BudgetCalculator>,
        settings: SummarizationSettings,
    ) -> Self {
        Self {
            store,
            generator,
            estimator,
            budgets,
            settings,
        }
    }

    pub fn settings(&self) -> &SummarizationSettings {
        &self.settings
    }

    /// Summarize the chat if its history has outgrown the model window.
    ///
    /// `provider`/`model` identify the conversational model whose window
    /// the history is measured against.
    pub async fn maybe_summarize(
        &self,
        chat_id: &str,
        provider: &str,
        model: &str,
    ) -> Result<SummaryOutcome> {
        if !self.settings.enabled {
            return Ok(SummaryOutcome::Skipped(SkipReason::Disabled));
        }
        let Some(generator) = &self.generator else {
            info!(chat_id, "No cheap generator configured, skipping summarization");
            return Ok(SummaryOutcome::Skipped(SkipReason::NoGenerator));
        };

        let chat = self.load_chat(chat_id).await?;
        let events = self.store.get_messages(chat_id).await?;

        let state = SummaryState::of(&chat, &events, self.settings.recheck_interval);
        if state == SummaryState::Fresh {
            debug!(chat_id, "Summary is fresh, skipping re-evaluation");
            return Ok(SummaryOutcome::Skipped(SkipReason::RecentlySummarized));
        }

        let turns: Vec<&ChatEvent> = events.iter().filter(|e| e.is_turn()).collect();
        let estimated: usize = turns
            .iter()
            .map(|e| self.estimator.estimate_message(&e.content, provider))
            .sum();
        let limit = self.budgets.context_limit(provider, model);

        if !self
            .settings
            .trigger
            .needs_summarizing(turns.len(), estimated, limit)
        {
            debug!(
                chat_id,
                messages = turns.len(),
                estimated,
                limit,
                "Conversation below summarization threshold"
            );
            return Ok(SummaryOutcome::Skipped(SkipReason::BelowThreshold));
        }

        info!(chat_id, ?state, messages = turns.len(), estimated, limit, "Summarizing conversation");
        self.summarize(generator.as_ref(), &chat, &events, false).await
    }

    /// Regenerate the summary now, bypassing the trigger.
    ///
    /// With `force`, the incremental path is skipped and the whole
    /// conversation is summarized from scratch.
    pub async fn regenerate(&self, chat_id: &str, force: bool) -> Result<SummaryOutcome> {
        let Some(generator) = &self.generator else {
            info!(chat_id, "No cheap generator configured, cannot regenerate summary");
            return Ok(SummaryOutcome::Skipped(SkipReason::NoGenerator));
        };
        let chat = self.load_chat(chat_id).await?;
        let events = self.store.get_messages(chat_id).await?;
        self.summarize(generator.as_ref(), &chat, &events, force).await
    }

    async fn load_chat(&self, chat_id: &str) -> Result<ChatMetadata> {
        self.store
            .find_by_id(chat_id)
            .await?
            .ok_or_else(|| StorageError::ChatNotFound(chat_id.to_string()).into())
    }

    async fn summarize(
        &self,
        generator: &dyn CheapGenerator,
        chat: &ChatMetadata,
        events: &[ChatEvent],
        force: bool,
    ) -> Result<SummaryOutcome> {
        let turns: Vec<&ChatEvent> = events.iter().filter(|e| e.is_turn()).collect();
        if turns.is_empty() {
            return Ok(SummaryOutcome::Skipped(SkipReason::NoMessages));
        }

        let (mode, summary) = match chat.summary().filter(|_| !force) {
            Some(previous) => {
                let window_start = turns.len().saturating_sub(self.settings.incremental_window);
                let task = CheapTask::UpdateSummary {
                    previous_summary: previous.to_string(),
                    recent_transcript: render_transcript(turns[window_start..].iter().copied()),
                };
                match run_summary_task(generator, task).await {
                    Ok(text) => (SummaryMode::Incremental, text),
                    Err(e) => {
                        warn!(chat_id = %chat.id, error = %e, "Incremental summary failed, regenerating in full");
                        let text = run_summary_task(generator, full_task(&turns)).await?;
                        (SummaryMode::FallbackFull, text)
                    }
                }
            }
            None => {
                let text = run_summary_task(generator, full_task(&turns)).await?;
                (SummaryMode::Full, text)
            }
        };

        self.store
            .update(
                &chat.id,
                ChatUpdate {
                    context_summary: Some(summary.clone()),
                    ..Default::default()
                },
            )
            .await?;
        self.store
            .add_message(&chat.id, ChatEvent::context_summary(summary.clone()))
            .await?;

        info!(chat_id = %chat.id, ?mode, chars = summary.len(), "Conversation summary saved");

        let title = self.title_from_summary(generator, chat, &summary).await;

        Ok(SummaryOutcome::Summarized {
            mode,
            summary,
            title,
        })
    }

    async fn title_from_summary(
        &self,
        generator: &dyn CheapGenerator,
        chat: &ChatMetadata,
        summary: &str,
    ) -> Option<String> {
        let task = CheapTask::TitleFromSummary {
            summary: summary.to_string(),
        };
        let title = match generator.generate(task).await {
            Ok(generation) => clean_title(&generation.text)?,
            Err(e) => {
                warn!(chat_id = %chat.id, error = %e, "Title generation from summary failed");
                return None;
            }
        };
        if title == chat.title {
            return None;
        }

        let update = ChatUpdate {
            title: Some(title.clone()),
            ..Default::default()
        };
        match self.store.update(&chat.id, update).await {
            Ok(_) => {
                info!(chat_id = %chat.id, title = %title, "Chat renamed from summary");
                Some(title)
            }
            Err(e) => {
                warn!(chat_id = %chat.id, error = %e, "Failed to save title from summary");
                None
            }
        }
    }
}

fn full_task(turns: &[&ChatEvent]) -> CheapTask {
    CheapTask::Summarize {
        transcript: render_transcript(turns.iter().copied()),
    }
}

async fn run_summary_task(
    generator: &dyn CheapGenerator,
    task: CheapTask,
) -> std::result::Result<String, GenerationError> {
    let kind = task.kind();
    let generation = generator.generate(task).await?;
    let text = generation.text.trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    debug!(task = kind, usage = ?generation.usage, "Cheap generation finished");
    Ok(text.to_string())
}
