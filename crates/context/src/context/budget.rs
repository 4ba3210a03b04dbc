//! Context-window table and token budget allocation.
//!
//! Each model family has a total context window and a proportional split
//! across the five consumers of that window:
//!
//! | Share | Standard (>16k) | Compact (≤16k) |
//! |-------|-----------------|----------------|
//! | System prompt | 10% | 15% |
//! | Memories | 10% | 10% |
//! | Summary | 10% | 10% |
//! | Recent messages | 55% | 40% |
//! | Response reserve | 15% | 25% |
//!
//! Unknown models fall back to a conservative 8192-token window.
//! Custom entries can be added at runtime via TOML config.

use hearth_config::ContextConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Context window assumed for models missing from the table.
pub const DEFAULT_CONTEXT_LIMIT: usize = 8192;

/// Windows at or below this size use [`Allocation::COMPACT`].
const COMPACT_WINDOW: usize = 16_384;

/// Fractions of the context window per content source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub system: f32,
    pub memory: f32,
    pub summary: f32,
    pub recent: f32,
    pub reserve: f32,
}

impl Allocation {
    pub const STANDARD: Allocation = Allocation {
        system: 0.10,
        memory: 0.10,
        summary: 0.10,
        recent: 0.55,
        reserve: 0.15,
    };

    pub const COMPACT: Allocation = Allocation {
        system: 0.15,
        memory: 0.10,
        summary: 0.10,
        recent: 0.40,
        reserve: 0.25,
    };

    /// The recommended split for a window of the given size.
    pub fn for_window(context_limit: usize) -> Self {
        if context_limit <= COMPACT_WINDOW {
            Self::COMPACT
        } else {
            Self::STANDARD
        }
    }
}

/// Context window and split for one model family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub context_limit: usize,
    pub allocation: Allocation,
}

impl ModelProfile {
    /// A profile using the recommended split for its window size.
    pub fn new(context_limit: usize) -> Self {
        Self {
            context_limit,
            allocation: Allocation::for_window(context_limit),
        }
    }
}

/// Token caps for one assembly call. All values are tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextBudget {
    pub total_limit: usize,
    pub system_prompt_budget: usize,
    pub memory_budget: usize,
    pub summary_budget: usize,
    pub recent_messages_budget: usize,
    pub response_reserve: usize,
}

impl ContextBudget {
    /// Split a profile's window, flooring each share.
    pub fn from_profile(profile: &ModelProfile) -> Self {
        let total = profile.context_limit;
        let share = |frac: f32| ((total as f64) * f64::from(frac.max(0.0))).floor() as usize;
        let alloc = &profile.allocation;

        let mut budget = Self {
            total_limit: total,
            system_prompt_budget: share(alloc.system),
            memory_budget: share(alloc.memory),
            summary_budget: share(alloc.summary),
            recent_messages_budget: share(alloc.recent),
            response_reserve: share(alloc.reserve),
        };

        // Float rounding must never push the shares past the window.
        let excess = budget.allocated().saturating_sub(total);
        budget.recent_messages_budget = budget.recent_messages_budget.saturating_sub(excess);
        budget
    }

    /// Sum of the four content budgets plus the response reserve.
    pub fn allocated(&self) -> usize {
        self.system_prompt_budget
            + self.memory_budget
            + self.summary_budget
            + self.recent_messages_budget
            + self.response_reserve
    }

    /// Tokens available to the request body.
    pub fn content_limit(&self) -> usize {
        self.total_limit.saturating_sub(self.response_reserve)
    }
}

/// Thread-safe model table with built-in defaults and custom overrides.
///
/// Keys are `provider/model-family`, e.g. `openai/gpt-4o`.
pub struct ModelTable {
    profiles: RwLock<HashMap<String, ModelProfile>>,
}

impl ModelTable {
    /// Create a table with the built-in model families.
    pub fn with_defaults() -> Self {
        let mut profiles = HashMap::new();
        let mut add = |key: &str, limit: usize| {
            profiles.insert(key.to_string(), ModelProfile::new(limit));
        };

        // ── Anthropic ──────────────────────────────────────────────
        add("anthropic/claude", 200_000);
        add("anthropic/claude-2", 100_000);
        add("anthropic/claude-instant", 100_000);

        // ── OpenAI ─────────────────────────────────────────────────
        add("openai/gpt-4o", 128_000);
        add("openai/gpt-4o-mini", 128_000);
        add("openai/gpt-4-turbo", 128_000);
        add("openai/gpt-4.1", 1_047_576);
        add("openai/gpt-4", 8_192);
        add("openai/gpt-3.5-turbo", 16_385);
        add("openai/o1", 200_000);
        add("openai/o3", 200_000);
        add("openai/o4-mini", 200_000);

        // ── Google ─────────────────────────────────────────────────
        add("google/gemini-1.5-pro", 2_097_152);
        add("google/gemini-1.5-flash", 1_048_576);
        add("google/gemini-2.0", 1_048_576);
        add("google/gemini-2.5", 1_048_576);

        // ── Mistral ────────────────────────────────────────────────
        add("mistral/mistral-large", 131_072);
        add("mistral/mistral-small", 32_768);
        add("mistral/open-mistral-nemo", 131_072);

        // ── DeepSeek ───────────────────────────────────────────────
        add("deepseek/deepseek", 65_536);

        // ── Meta ───────────────────────────────────────────────────
        add("meta-llama/llama-3.1", 131_072);
        add("meta-llama/llama-3", 8_192);

        // ── Local (Ollama) ─────────────────────────────────────────
        add("ollama/llama3", 8_192);
        add("ollama/mistral", 8_192);

        Self {
            profiles: RwLock::new(profiles),
        }
    }

    /// Create an empty table (every lookup hits the default window).
    pub fn empty() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Built-in table plus the custom profiles from config.
    pub fn from_config(config: &ContextConfig) -> Self {
        let table = Self::with_defaults();
        for custom in &config.models {
            let allocation = match &custom.allocation {
                Some(a) => Allocation {
                    system: a.system,
                    memory: a.memory,
                    summary: a.summary,
                    recent: a.recent,
                    reserve: a.reserve,
                },
                None => Allocation::for_window(custom.context_limit),
            };
            table.set(
                format!("{}/{}", custom.provider, custom.model),
                ModelProfile {
                    context_limit: custom.context_limit,
                    allocation,
                },
            );
        }
        table
    }

    /// Add or replace a profile.
    pub fn set(&self, key: impl Into<String>, profile: ModelProfile) {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        profiles.insert(key.into().to_lowercase(), profile);
    }

    /// Look up the profile for a model.
    ///
    /// Supports flexible matching: tries the exact qualified name first
    /// (`openai/gpt-4o`, or the model as given when it already carries a
    /// vendor prefix such as OpenRouter's `anthropic/claude-sonnet-4`), then
    /// the longest family prefix (`gpt-4o-mini-2024-07-18` matches
    /// `gpt-4o-mini`), preferring the requested provider on ties. Unknown
    /// models get [`DEFAULT_CONTEXT_LIMIT`].
    pub fn lookup(&self, provider: &str, model: &str) -> ModelProfile {
        let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        let provider = provider.to_lowercase();
        let model = model.to_lowercase();

        let (vendor, bare_model) = match model.rsplit_once('/') {
            Some((vendor, bare)) => (vendor.to_string(), bare.to_string()),
            None => (provider.clone(), model.clone()),
        };

        // 1. Exact match
        for key in [format!("{provider}/{model}"), format!("{vendor}/{bare_model}")] {
            if let Some(p) = profiles.get(&key) {
                return *p;
            }
        }

        // 2. Longest family prefix
        let mut best: Option<((usize, bool), &ModelProfile)> = None;
        for (key, profile) in profiles.iter() {
            let (key_vendor, bare_key) = key.rsplit_once('/').unwrap_or(("", key.as_str()));
            if !bare_model.starts_with(bare_key) {
                continue;
            }
            let rank = (bare_key.len(), key_vendor == vendor || key_vendor == provider);
            if best.is_none_or(|(best_rank, _)| rank > best_rank) {
                best = Some((rank, profile));
            }
        }

        match best {
            Some((_, p)) => *p,
            None => ModelProfile::new(DEFAULT_CONTEXT_LIMIT),
        }
    }

    /// List all known model keys, sorted.
    pub fn models(&self) -> Vec<String> {
        let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = profiles.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of profiles in the table.
    pub fn len(&self) -> usize {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ModelTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Derives per-call budgets from the model table.
pub struct BudgetCalculator {
    table: ModelTable,
}

impl BudgetCalculator {
    pub fn new(table: ModelTable) -> Self {
        Self { table }
    }

    /// The model's total context window.
    pub fn context_limit(&self, provider: &str, model: &str) -> usize {
        self.table.lookup(provider, model).context_limit
    }

    /// The model's recommended proportional split.
    pub fn allocation(&self, provider: &str, model: &str) -> Allocation {
        self.table.lookup(provider, model).allocation
    }

    /// Compute a fresh budget. Always succeeds.
    pub fn calculate(&self, provider: &str, model: &str) -> ContextBudget {
        ContextBudget::from_profile(&self.table.lookup(provider, model))
    }

    pub fn table(&self) -> &ModelTable {
        &self.table
    }
}

impl Default for BudgetCalculator {
    fn default() -> Self {
        Self::new(ModelTable::with_defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_config::{AllocationConfig, ModelProfileConfig};

    #[test]
    fn default_table_has_models() {
        let table = ModelTable::with_defaults();
        assert!(table.len() >= 20);
        assert!(!table.is_empty());
    }

    #[test]
    fn exact_match() {
        let table = ModelTable::with_defaults();
        assert_eq!(table.lookup("openai", "gpt-4o").context_limit, 128_000);
        assert_eq!(table.lookup("openai", "gpt-4").context_limit, 8_192);
    }

    #[test]
    fn vendor_prefixed_model_via_router() {
        let table = ModelTable::with_defaults();
        let p = table.lookup("openrouter", "anthropic/claude-sonnet-4");
        assert_eq!(p.context_limit, 200_000);
    }

    #[test]
    fn versioned_model_matches_longest_family() {
        let table = ModelTable::with_defaults();
        // gpt-4o-mini wins over gpt-4o and gpt-4
        let p = table.lookup("openai", "gpt-4o-mini-2024-07-18");
        assert_eq!(p.context_limit, 128_000);
        let p = table.lookup("anthropic", "claude-2.1");
        assert_eq!(p.context_limit, 100_000);
    }

    #[test]
    fn unknown_model_gets_conservative_default() {
        let table = ModelTable::with_defaults();
        let p = table.lookup("acme", "mystery-model");
        assert_eq!(p.context_limit, DEFAULT_CONTEXT_LIMIT);
        assert_eq!(p.allocation, Allocation::COMPACT);
    }

    #[test]
    fn budget_never_exceeds_window() {
        let calc = BudgetCalculator::default();
        for (provider, model) in [
            ("openai", "gpt-4o"),
            ("openai", "gpt-3.5-turbo"),
            ("anthropic", "claude-3-haiku"),
            ("google", "gemini-1.5-pro"),
            ("acme", "unknown"),
        ] {
            let b = calc.calculate(provider, model);
            assert!(b.allocated() <= b.total_limit, "{provider}/{model}");
            assert!(b.recent_messages_budget > b.system_prompt_budget);
        }
    }

    #[test]
    fn standard_split_for_large_window() {
        let b = ContextBudget::from_profile(&ModelProfile::new(100_000));
        assert_eq!(b.system_prompt_budget, 10_000);
        assert_eq!(b.recent_messages_budget, 55_000);
        assert_eq!(b.response_reserve, 15_000);
        assert_eq!(b.content_limit(), 85_000);
    }

    #[test]
    fn config_overrides_builtin() {
        let config = ContextConfig {
            models: vec![ModelProfileConfig {
                provider: "openai".into(),
                model: "gpt-4o".into(),
                context_limit: 10_000,
                allocation: Some(AllocationConfig {
                    system: 0.2,
                    memory: 0.1,
                    summary: 0.1,
                    recent: 0.4,
                    reserve: 0.2,
                }),
            }],
            ..Default::default()
        };
        let calc = BudgetCalculator::new(ModelTable::from_config(&config));
        let b = calc.calculate("openai", "gpt-4o");
        assert_eq!(b.total_limit, 10_000);
        assert_eq!(b.system_prompt_budget, 2_000);
        assert_eq!(b.recent_messages_budget, 4_000);
    }

    #[test]
    fn list_models_sorted() {
        let table = ModelTable::with_defaults();
        let models = table.models();
        assert!(models.contains(&"openai/gpt-4o".to_string()));
        assert!(models.windows(2).all(|w| w[0] <= w[1]));
    }
}
