//! Conversation summary formatting.
//!
//! The stored summary is placed under a fixed header. If it does not fit,
//! only the body is truncated; the header is never cut.

use hearth_core::TokenEstimator;
use serde::{Deserialize, Serialize};

pub const SUMMARY_HEADER: &str = "[Conversation Summary]\n";

/// The summary block as it will appear in the system message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryBlock {
    /// Header plus body, empty when no summary is included.
    pub text: String,
    pub tokens: usize,
    pub included: bool,
    pub truncated: bool,
}

pub struct SummarySelector<'a> {
    estimator: &'a dyn TokenEstimator,
    provider: &'a str,
}

impl<'a> SummarySelector<'a> {
    pub fn new(estimator: &'a dyn TokenEstimator, provider: &'a str) -> Self {
        Self {
            estimator,
            provider,
        }
    }

    /// Format `summary` for a `budget`-token slot.
    ///
    /// Only the body is measured against `budget`, so a body that fits is
    /// kept byte-identical and the block may exceed `budget` by the cost of
    /// [`SUMMARY_HEADER`]. A body that does not fit is cut so that header
    /// plus body stay within `budget`.
    pub fn format(&self, summary: Option<&str>, budget: usize) -> SummaryBlock {
        let Some(summary) = summary.filter(|s| !s.trim().is_empty()) else {
            return SummaryBlock::default();
        };

        let body_tokens = self.estimator.estimate(summary, self.provider);
        if body_tokens <= budget {
            let text = format!("{}{}", SUMMARY_HEADER, summary);
            let tokens = self.estimator.estimate(&text, self.provider);
            return SummaryBlock {
                text,
                tokens,
                included: true,
                truncated: false,
            };
        }

        let header_tokens = self.estimator.estimate(SUMMARY_HEADER, self.provider);
        let body_budget = budget.saturating_sub(header_tokens);
        let body = self
            .estimator
            .truncate_to_limit(summary, body_budget, self.provider);
        if body.trim().is_empty() {
            return SummaryBlock::default();
        }

        let text = format!("{}{}", SUMMARY_HEADER, body);
        let tokens = self.estimator.estimate(&text, self.provider);
        SummaryBlock {
            text,
            tokens,
            included: true,
            truncated: true,
        }
    }
}

/// Free-function form of [`SummarySelector::format`].
pub fn format_summary_for_context(
    estimator: &dyn TokenEstimator,
    provider: &str,
    summary: Option<&str>,
    budget: usize,
) -> SummaryBlock {
    SummarySelector::new(estimator, provider).format(summary, budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::token::HeuristicEstimator;

    #[test]
    fn absent_summary_is_empty() {
        let est = HeuristicEstimator::new();
        let block = format_summary_for_context(&est, "openai", None, 100);
        assert!(!block.included);
        assert_eq!(block.tokens, 0);
        assert!(block.text.is_empty());

        let block = format_summary_for_context(&est, "openai", Some(""), 100);
        assert!(!block.included);
    }

    #[test]
    fn fitting_summary_is_byte_identical_after_header() {
        let est = HeuristicEstimator::new();
        let summary = "Mara rescued Tom from the wreck.  They now share tea nightly.";
        let block = format_summary_for_context(&est, "openai", Some(summary), 100);
        assert!(block.included);
        assert!(!block.truncated);
        assert_eq!(block.text, format!("{SUMMARY_HEADER}{summary}"));
        assert_eq!(block.text.strip_prefix(SUMMARY_HEADER), Some(summary));
    }

    #[test]
    fn overflowing_summary_truncates_body_only() {
        let est = HeuristicEstimator::new();
        let summary = "Long history. ".repeat(100);
        let block = format_summary_for_context(&est, "openai", Some(&summary), 30);
        assert!(block.truncated);
        assert!(block.text.starts_with(SUMMARY_HEADER));
        assert!(block.tokens <= 30);
    }

    #[test]
    fn no_room_for_body_drops_summary() {
        let est = HeuristicEstimator::new();
        let summary = "Long history. ".repeat(100);
        let block = format_summary_for_context(&est, "openai", Some(&summary), 3);
        assert!(!block.included);
        assert_eq!(block.tokens, 0);
    }
}
