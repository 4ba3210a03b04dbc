//! The context engine — what the model sees, and the housekeeping that keeps it small.
//!
//! Two halves with very different timing:
//!
//! 1. **Assembly** ([`context`]) runs on the request path, before every LLM
//!    call. It splits the model window into budgets and fills them from the
//!    character prompt, recalled memories, the rolling summary, and as much
//!    recent history as fits.
//! 2. **Housekeeping** ([`background`]) runs after a turn completes, off the
//!    request path. It keeps the rolling summary current and the chat title
//!    relevant, using a cheap model.
//!
//! The summary written by housekeeping is what lets assembly drop old
//! history without losing the thread of the conversation.

pub mod background;
pub mod context;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use background::{
    BackgroundScheduler, SkipReason, SummarizationScheduler, SummarizationSettings, SummaryOutcome,
    SummaryTrigger, TaskKind, TitleOutcome, TitleScheduler, TitleSettings, TurnTasks,
};
pub use context::{
    AssemblerOptions, AssemblyRequest, BudgetCalculator, BuiltContext, ContextAssembler,
    ContextBudget, HeuristicEstimator, ModelProfile, ModelTable, TokenUsage,
};
