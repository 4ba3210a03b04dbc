//! Memory selection under a token cap.
//!
//! Candidates are ranked by relevance score, with near-ties (scores within
//! [`NEAR_TIE_THRESHOLD`]) broken by importance. The ranked list is then
//! filled greedily: each memory becomes one `- summary` line, and selection
//! stops at the first memory that would overflow the budget. Memories are
//! never partially included.

use hearth_core::{ScoredMemory, TokenEstimator};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Scores closer than this are ranked by importance instead.
pub const NEAR_TIE_THRESHOLD: f32 = 0.1;

/// Absorbs f32 representation error around the threshold (0.95 - 0.85).
const TIE_EPSILON: f32 = 1e-6;

const MEMORY_HEADER: &str = "[Relevant Memories]";

/// The memories that made it into the context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySelection {
    /// Formatted block, empty when nothing fit.
    pub text: String,
    pub tokens: usize,
    pub count: usize,
    /// Included memories in ranked order.
    pub debug_memories: Vec<ScoredMemory>,
}

/// Ordering used for memory ranking: higher score first, near-ties by higher importance.
pub fn compare_memories(a: &ScoredMemory, b: &ScoredMemory) -> Ordering {
    if (a.score - b.score).abs() <= NEAR_TIE_THRESHOLD + TIE_EPSILON {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(Ordering::Equal)
    } else {
        b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
    }
}

/// Rank memories with [`compare_memories`].
///
/// The near-tie rule is not transitive, so this uses a stable insertion
/// sort over the pairwise comparison; candidate lists are short and the
/// result is reproducible for a given input order.
pub fn rank_memories(memories: &[ScoredMemory]) -> Vec<ScoredMemory> {
    let mut ranked = memories.to_vec();
    for i in 1..ranked.len() {
        let mut j = i;
        while j > 0 && compare_memories(&ranked[j], &ranked[j - 1]) == Ordering::Less {
            ranked.swap(j, j - 1);
            j -= 1;
        }
    }
    ranked
}

pub struct MemorySelector<'a> {
    estimator: &'a dyn TokenEstimator,
    provider: &'a str,
}

impl<'a> MemorySelector<'a> {
    pub fn new(estimator: &'a dyn TokenEstimator, provider: &'a str) -> Self {
        Self {
            estimator,
            provider,
        }
    }

    /// Rank and greedily fill `budget` tokens.
    pub fn select(&self, candidates: &[ScoredMemory], budget: usize) -> MemorySelection {
        let mut lines: Vec<String> = Vec::new();
        let mut included: Vec<ScoredMemory> = Vec::new();
        let mut text = String::new();
        let mut tokens = 0;

        for memory in rank_memories(candidates) {
            let summary = one_line(&memory.summary);
            if summary.is_empty() {
                continue;
            }
            lines.push(format!("- {}", summary));
            let candidate = format!("{}\n{}", MEMORY_HEADER, lines.join("\n"));
            let candidate_tokens = self.estimator.estimate(&candidate, self.provider);
            if candidate_tokens > budget {
                lines.pop();
                break;
            }
            text = candidate;
            tokens = candidate_tokens;
            included.push(memory);
        }

        MemorySelection {
            text,
            tokens,
            count: included.len(),
            debug_memories: included,
        }
    }
}

fn one_line(summary: &str) -> String {
    summary.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::token::HeuristicEstimator;

    fn mem(summary: &str, importance: f32, score: f32) -> ScoredMemory {
        ScoredMemory::new(summary, importance, score)
    }

    #[test]
    fn near_tie_broken_by_importance() {
        let ranked = rank_memories(&[mem("first", 0.3, 0.9), mem("second", 0.9, 0.85)]);
        assert_eq!(ranked[0].summary, "second");
        assert_eq!(ranked[1].summary, "first");
    }

    #[test]
    fn clear_gap_ranked_by_score() {
        let ranked = rank_memories(&[mem("low", 1.0, 0.5), mem("high", 0.0, 0.9)]);
        assert_eq!(ranked[0].summary, "high");
    }

    #[test]
    fn tie_threshold_is_inclusive() {
        let ranked = rank_memories(&[mem("a", 0.1, 0.95), mem("b", 0.9, 0.85)]);
        assert_eq!(ranked[0].summary, "b");
    }

    #[test]
    fn greedy_cutoff_two_of_three() {
        let est = HeuristicEstimator::new();
        let selector = MemorySelector::new(&est, "openai");
        // Header (19 bytes) + "\n- aaaa..." lines of 2 + 1 + 37 = 40 bytes each:
        // 1 memory = 59 bytes (15 tokens), 2 = 99 (25), 3 = 139 (35).
        let line = "a".repeat(37);
        let candidates = vec![
            mem(&line, 0.5, 0.9),
            mem(&line, 0.5, 0.6),
            mem(&line, 0.5, 0.3),
        ];

        let selection = selector.select(&candidates, 30);
        assert_eq!(selection.count, 2);
        assert_eq!(selection.debug_memories.len(), 2);
        assert_eq!(selection.tokens, 25);
        assert!(selection.tokens <= 30);
    }

    #[test]
    fn nothing_fits_returns_empty_block() {
        let est = HeuristicEstimator::new();
        let selector = MemorySelector::new(&est, "openai");
        let selection = selector.select(&[mem("a long memory summary", 0.5, 0.9)], 3);
        assert_eq!(selection.count, 0);
        assert!(selection.text.is_empty());
        assert_eq!(selection.tokens, 0);
    }

    #[test]
    fn stops_at_first_overflow() {
        let est = HeuristicEstimator::new();
        let selector = MemorySelector::new(&est, "openai");
        let big = "b".repeat(400);
        let candidates = vec![
            mem("short one", 0.5, 0.9),
            mem(&big, 0.5, 0.7),
            mem("tiny", 0.5, 0.2),
        ];
        let selection = selector.select(&candidates, 30);
        // "tiny" would fit but selection is greedy without skipping
        assert_eq!(selection.count, 1);
        assert_eq!(selection.debug_memories[0].summary, "short one");
    }

    #[test]
    fn block_format() {
        let est = HeuristicEstimator::new();
        let selector = MemorySelector::new(&est, "openai");
        let selection = selector.select(
            &[mem("Likes tea", 0.5, 0.9), mem("Fears\nthe sea", 0.9, 0.2)],
            1_000,
        );
        assert_eq!(
            selection.text,
            "[Relevant Memories]\n- Likes tea\n- Fears the sea"
        );
    }
}
