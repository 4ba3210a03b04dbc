//! Recent-message windowing.
//!
//! Sliding window from newest to oldest: each message costs its content
//! estimate plus [`MESSAGE_OVERHEAD_TOKENS`]. Selection stops at the first
//! message that would overflow. If not even the newest message fits, it is
//! included anyway so a chat with history never loses all conversational
//! context; the result is then flagged as truncated and over budget.

use hearth_core::{ContextMessage, MESSAGE_OVERHEAD_TOKENS, TokenEstimator};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecentSelection {
    /// Kept messages in chronological order, with token metadata attached.
    pub messages: Vec<ContextMessage>,
    pub tokens: usize,
    /// Some history was left out.
    pub truncated: bool,
    /// The newest message alone exceeded the budget and was included anyway.
    pub forced: bool,
}

pub struct RecentMessageSelector<'a> {
    estimator: &'a dyn TokenEstimator,
    provider: &'a str,
}

impl<'a> RecentMessageSelector<'a> {
    pub fn new(estimator: &'a dyn TokenEstimator, provider: &'a str) -> Self {
        Self {
            estimator,
            provider,
        }
    }

    fn cost(&self, message: &ContextMessage) -> usize {
        self.estimator.estimate(&message.content, self.provider) + MESSAGE_OVERHEAD_TOKENS
    }

    /// Select from `history` (chronological) within `budget` tokens.
    pub fn select(&self, history: &[ContextMessage], budget: usize) -> RecentSelection {
        let mut kept: Vec<ContextMessage> = Vec::new();
        let mut used = 0;
        let mut truncated = false;

        for message in history.iter().rev() {
            let cost = self.cost(message);
            if used + cost > budget {
                truncated = true;
                break;
            }
            used += cost;
            kept.push(message.clone().with_metadata(false, cost));
        }

        let mut forced = false;
        if kept.is_empty() {
            if let Some(newest) = history.last() {
                let cost = self.cost(newest);
                debug!(
                    tokens = cost,
                    budget, "Newest message exceeds recent budget, including it anyway"
                );
                kept.push(newest.clone().with_metadata(false, cost));
                used = cost;
                truncated = true;
                forced = true;
            }
        }

        // Restore chronological order.
        kept.reverse();

        RecentSelection {
            messages: kept,
            tokens: used,
            truncated,
            forced,
        }
    }
}
