//! Fire-and-forget chat housekeeping.
//!
//! After each completed turn, two passes may run off the request path:
//!
//! - [`SummarizationScheduler`] keeps the rolling conversation summary current
//! - [`TitleScheduler`] reconsiders the chat title at interchange checkpoints
//!
//! [`BackgroundScheduler`] owns both, spawns them on the Tokio runtime,
//! serializes passes per chat, and reports failures centrally.

pub mod scheduler;
pub mod summarization;
pub mod title;

use serde::Serialize;

pub use scheduler::{BackgroundScheduler, SchedulerStats, TaskKind, TurnTasks};
pub use summarization::{
    SummarizationScheduler, SummarizationSettings, SummaryMode, SummaryOutcome, SummaryState,
    SummaryTrigger, messages_since_last_summary,
};
pub use title::{
    TITLE_CHECKPOINTS, TitleOutcome, TitleScheduler, TitleSettings, calculate_interchange_count,
    is_title_checkpoint, should_check_title_at_interchange,
};

/// Why a background pass did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Turned off in configuration.
    Disabled,
    /// No cheap generator is configured.
    NoGenerator,
    /// A pass of the same kind is already running for this chat.
    InFlight,
    /// Summary exists and too few messages arrived since.
    RecentlySummarized,
    /// History is not large enough to need a summary.
    BelowThreshold,
    /// Nothing to summarize.
    NoMessages,
    /// Interchange count is not a fresh title checkpoint.
    NotCheckpoint,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::Disabled => "disabled",
            SkipReason::NoGenerator => "no cheap generator",
            SkipReason::InFlight => "already in flight",
            SkipReason::RecentlySummarized => "recently summarized",
            SkipReason::BelowThreshold => "below threshold",
            SkipReason::NoMessages => "no messages",
            SkipReason::NotCheckpoint => "not a checkpoint",
        };
        write!(f, "{s}")
    }
}
