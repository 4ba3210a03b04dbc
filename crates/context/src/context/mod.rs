//! Request-time context assembly.
//!
//! Assembles one LLM call's input from four sources under a per-model
//! token budget. Each source has its own selector:
//!
//! | Source | Selector | Trim Strategy |
//! |--------|----------|---------------|
//! | System prompt | [`SystemPromptBuilder`] | Whole string truncated |
//! | Memories | [`MemorySelector`] | Lowest-ranked dropped, never partial |
//! | Summary | [`SummarySelector`] | Body truncated, header kept |
//! | Recent messages | [`RecentMessageSelector`] | Oldest dropped, newest always kept |

pub mod assembler;
pub mod budget;
pub mod memory;
pub mod recent;
pub mod summary;
pub mod system_prompt;
pub mod token;

pub use assembler::{AssemblerOptions, AssemblyRequest, BuiltContext, ContextAssembler, TokenUsage};
pub use budget::{
    Allocation, BudgetCalculator, ContextBudget, DEFAULT_CONTEXT_LIMIT, ModelProfile, ModelTable,
};
pub use memory::{MemorySelection, MemorySelector, NEAR_TIE_THRESHOLD, compare_memories, rank_memories};
pub use recent::{RecentMessageSelector, RecentSelection};
pub use summary::{SUMMARY_HEADER, SummaryBlock, SummarySelector, format_summary_for_context};
pub use system_prompt::{SystemPrompt, SystemPromptBuilder};
pub use token::{HeuristicEstimator, estimate_tokens};
