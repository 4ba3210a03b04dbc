//! Context assembly pipeline — the request-time critical path.
//!
//! Assembles the bounded input for one LLM call from four sources, in a
//! fixed order that matters for correctness:
//!
//! 1. **Budget** from the model table
//! 2. **System prompt** (character + persona), truncated to its budget
//! 3. **Memories** recalled for the *new* user message, ranked and greedily filled
//! 4. **Conversation summary**, body truncated to its budget
//! 5. **Recent messages** within what the above left over (and their own cap)
//!
//! The output is one system message (prompt, memories, summary), the kept
//! history in chronological order, and the new user message last.
//!
//! # Failure semantics
//!
//! Assembly never fails. A memory search error degrades to zero memories
//! plus a warning; an oversized prompt or summary is truncated with a
//! warning. The only network call on this path is memory search.

use crate::background::summarization::SummaryTrigger;
use crate::context::budget::{BudgetCalculator, ContextBudget};
use crate::context::memory::MemorySelector;
use crate::context::recent::RecentMessageSelector;
use crate::context::summary::SummarySelector;
use crate::context::system_prompt::SystemPromptBuilder;
use hearth_config::AppConfig;
use hearth_core::{
    Character, ChatEvent, ChatMetadata, ContextMessage, MemorySearch, MemorySearchOptions,
    Persona, ScoredMemory, TokenEstimator,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

// ── Types ─────────────────────────────────────────────────────────────────

/// All inputs required for a single assembly.
pub struct AssemblyRequest<'a> {
    /// Provider of the conversational model.
    pub provider: &'a str,
    /// Conversational model name.
    pub model: &'a str,
    pub character: &'a Character,
    pub persona: Option<&'a Persona>,
    pub chat: &'a ChatMetadata,
    /// Stored chat history in chronological order (markers are skipped).
    pub history: &'a [ChatEvent],
    /// The incoming user message, not yet part of `history`.
    pub user_message: &'a str,
}

/// Tokens spent per content source.
///
/// `system_prompt`, `memories` and `summary` are the parts as estimated
/// alone. `system_message` is the joined system message as sent, with
/// separators and per-message overhead; `total` counts that instead of
/// the parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub system_prompt: usize,
    pub memories: usize,
    pub summary: usize,
    pub system_message: usize,
    pub recent_messages: usize,
    /// The incoming user message, including per-message overhead.
    pub new_message: usize,
    /// `system_message + recent_messages + new_message`.
    pub total: usize,
}

/// The assembled context, ready for an LLM API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltContext {
    /// System message, kept history, then the new user message.
    pub messages: Vec<ContextMessage>,
    pub token_usage: TokenUsage,
    pub budget: ContextBudget,
    pub included_summary: bool,
    pub memories_included: usize,
    pub messages_included: usize,
    pub messages_truncated: bool,
    /// `token_usage.total` exceeds `total_limit - response_reserve`.
    ///
    /// Happens when a single message is forced in (`messages_truncated` is
    /// also set) or when the new user message alone leaves no room.
    pub over_budget: bool,
    pub warnings: Vec<String>,
    /// Memories that made it in, in ranked order.
    pub debug_memories: Vec<ScoredMemory>,
}

impl BuiltContext {
    /// The leading system message.
    pub fn system_message(&self) -> Option<&ContextMessage> {
        self.messages.first()
    }
}

/// Tunables for memory recall and the summarization warning.
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Maximum memory candidates requested per assembly.
    pub memory_candidate_limit: usize,
    pub min_importance: f32,
    /// Decides when a truncated conversation warrants a summarization warning.
    pub summary_trigger: SummaryTrigger,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            memory_candidate_limit: 10,
            min_importance: 0.0,
            summary_trigger: SummaryTrigger::default(),
        }
    }
}

impl From<&AppConfig> for AssemblerOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            memory_candidate_limit: config.context.memory_candidate_limit,
            min_importance: config.context.min_importance,
            summary_trigger: SummaryTrigger::from(&config.summarization),
        }
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Stateless per call — create one and reuse it.
pub struct ContextAssembler {
    estimator: Arc<dyn TokenEstimator>,
    memory_search: Option<Arc<dyn MemorySearch>>,
    budgets: Arc<BudgetCalculator>,
    options: AssemblerOptions,
}

impl ContextAssembler {
    pub fn new(
        estimator: Arc<dyn TokenEstimator>,
        memory_search: Option<Arc<dyn MemorySearch>>,
        budgets: Arc<BudgetCalculator>,
        options: AssemblerOptions,
    ) -> Self {
        Self {
            estimator,
            memory_search,
            budgets,
            options,
        }
    }

    /// Assemble with a budget computed from the model table.
    pub async fn assemble(&self, request: &AssemblyRequest<'_>) -> BuiltContext {
        let budget = self.budgets.calculate(request.provider, request.model);
        self.assemble_with_budget(request, budget).await
    }

    /// Assemble against an explicit budget.
    ///
    /// # Algorithm
    ///
    /// 1. Build + truncate the system prompt against `system_prompt_budget`
    /// 2. Recall memories for the new user message, fill `memory_budget`
    /// 3. Format the stored summary against `summary_budget`
    /// 4. `remaining = total - system message - reserve - new message`
    /// 5. Window recent messages against `min(remaining, recent_messages_budget)`
    /// 6. Emit messages, aggregate usage, attach warnings
    pub async fn assemble_with_budget(
        &self,
        request: &AssemblyRequest<'_>,
        budget: ContextBudget,
    ) -> BuiltContext {
        let provider = request.provider;
        let estimator = self.estimator.as_ref();
        let mut warnings: Vec<String> = Vec::new();

        // ── System prompt ──────────────────────────────────────────────────
        let prompt = SystemPromptBuilder::new(estimator, provider).build(
            request.character,
            request.persona,
            budget.system_prompt_budget,
        );
        if let Some(w) = &prompt.warning {
            warnings.push(w.clone());
        }

        // ── Memories ───────────────────────────────────────────────────────
        let candidates = self
            .recall_memories(request, budget.memory_budget, &mut warnings)
            .await;
        let memories =
            MemorySelector::new(estimator, provider).select(&candidates, budget.memory_budget);

        // ── Summary ────────────────────────────────────────────────────────
        let summary = SummarySelector::new(estimator, provider)
            .format(request.chat.summary(), budget.summary_budget);
        if summary.truncated {
            warnings.push(format!(
                "Conversation summary truncated to fit the {}-token budget",
                budget.summary_budget
            ));
        }

        // ── System message ─────────────────────────────────────────────────
        let system_content = [
            prompt.text.as_str(),
            memories.text.as_str(),
            summary.text.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n\n");
        let fixed = estimator.estimate_message(&system_content, provider);

        // ── Recent messages ────────────────────────────────────────────────
        let new_message_tokens = estimator.estimate_message(request.user_message, provider);
        let remaining = budget
            .total_limit
            .saturating_sub(fixed)
            .saturating_sub(budget.response_reserve)
            .saturating_sub(new_message_tokens);
        let recent_budget = remaining.min(budget.recent_messages_budget);

        let history: Vec<ContextMessage> = request
            .history
            .iter()
            .filter(|e| e.is_turn())
            .map(|e| ContextMessage::new(e.role, e.content.clone()))
            .collect();
        let recent = RecentMessageSelector::new(estimator, provider).select(&history, recent_budget);

        if recent.forced {
            warnings.push(format!(
                "Most recent message exceeds the {}-token history budget and was included in full",
                recent_budget
            ));
        }

        if recent.truncated {
            let full_tokens: usize = history
                .iter()
                .map(|m| estimator.estimate_message(&m.content, provider))
                .sum();
            if self.options.summary_trigger.needs_summarizing(
                history.len(),
                full_tokens,
                budget.total_limit,
            ) {
                warnings.push(format!(
                    "Conversation history ({} messages, ~{} tokens) exceeds the context window; summarizing this chat is recommended",
                    history.len(),
                    full_tokens
                ));
            }
        }

        if fixed + new_message_tokens > budget.content_limit() {
            warnings.push(format!(
                "New message ({} tokens) leaves no room within the {}-token context limit",
                new_message_tokens,
                budget.content_limit()
            ));
        }

        // ── Emit ───────────────────────────────────────────────────────────
        let messages_included = recent.messages.len();
        let mut messages = Vec::with_capacity(messages_included + 2);
        messages.push(ContextMessage::system(system_content).with_metadata(true, fixed));
        messages.extend(recent.messages);
        messages.push(
            ContextMessage::user(request.user_message).with_metadata(false, new_message_tokens),
        );

        let token_usage = TokenUsage {
            system_prompt: prompt.tokens,
            memories: memories.tokens,
            summary: summary.tokens,
            system_message: fixed,
            recent_messages: recent.tokens,
            new_message: new_message_tokens,
            total: fixed + recent.tokens + new_message_tokens,
        };
        let over_budget = token_usage.total > budget.content_limit();

        debug!(
            chat_id = %request.chat.id,
            total = token_usage.total,
            limit = budget.content_limit(),
            memories = memories.count,
            messages = messages_included,
            truncated = recent.truncated,
            "Context assembled"
        );

        BuiltContext {
            messages,
            token_usage,
            budget,
            included_summary: summary.included,
            memories_included: memories.count,
            messages_included,
            messages_truncated: recent.truncated,
            over_budget,
            warnings,
            debug_memories: memories.debug_memories,
        }
    }

    /// Fetch memory candidates; failures degrade to none plus a warning.
    async fn recall_memories(
        &self,
        request: &AssemblyRequest<'_>,
        memory_budget: usize,
        warnings: &mut Vec<String>,
    ) -> Vec<ScoredMemory> {
        let Some(search) = &self.memory_search else {
            return Vec::new();
        };
        if memory_budget == 0 || request.user_message.trim().is_empty() {
            return Vec::new();
        }

        let options = MemorySearchOptions {
            user_id: request.chat.user_id.clone(),
            limit: self.options.memory_candidate_limit,
            min_importance: self.options.min_importance,
        };

        match search
            .search(&request.chat.character_id, request.user_message, &options)
            .await
        {
            Ok(mut found) => {
                found.truncate(options.limit);
                debug!(count = found.len(), backend = search.name(), "Recalled memories for context");
                found
            }
            Err(e) => {
                warn!(chat_id = %request.chat.id, error = %e, "Memory search failed, continuing without memories");
                warnings.push(format!("Memory search failed: {e}"));
                Vec::new()
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
