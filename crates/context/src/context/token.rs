//! Heuristic token estimation.
//!
//! Uses a character-based heuristic: ~4 bytes per token.
//! This approximation is accurate within ~10% for BPE tokenizers
//! (GPT-4, Claude, Llama) on English text, and keeps test cases predictable.

use hearth_core::token::TokenEstimator;

/// Marker appended to truncated text.
const ELLIPSIS: &str = "...";

/// The default [`TokenEstimator`]: 1 token ≈ 4 bytes, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl HeuristicEstimator {
    pub const BYTES_PER_TOKEN: usize = 4;

    pub fn new() -> Self {
        Self
    }
}

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(HeuristicEstimator::BYTES_PER_TOKEN)
}

/// Cut `text` to at most `max_bytes`, backing off to a UTF-8 char boundary.
fn cut_at_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str, _provider: &str) -> usize {
        estimate_tokens(text)
    }

    fn truncate_to_limit(&self, text: &str, max_tokens: usize, _provider: &str) -> String {
        if estimate_tokens(text) <= max_tokens {
            return text.to_string();
        }
        let max_bytes = max_tokens * Self::BYTES_PER_TOKEN;
        if max_bytes <= ELLIPSIS.len() {
            return cut_at_boundary(text, max_bytes).to_string();
        }
        let kept = cut_at_boundary(text, max_bytes - ELLIPSIS.len()).trim_end();
        format!("{kept}{ELLIPSIS}")
    }
}
