//! Token estimation trait.
//!
//! Exact tokenization differs per model family, so the engine treats it as
//! an injected collaborator. Every budget decision goes through this trait.

/// Fixed per-message overhead (role name, delimiters, wire formatting).
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Estimates and enforces token counts for a provider's tokenizer.
pub trait TokenEstimator: Send + Sync {
    /// Estimated token count of `text` for `provider`.
    fn estimate(&self, text: &str, provider: &str) -> usize;

    /// Shorten `text` so that `estimate(result) <= max_tokens`.
    ///
    /// Text that already fits is returned unchanged.
    fn truncate_to_limit(&self, text: &str, max_tokens: usize, provider: &str) -> String;

    /// Estimated cost of a message, including [`MESSAGE_OVERHEAD_TOKENS`].
    fn estimate_message(&self, content: &str, provider: &str) -> usize {
        self.estimate(content, provider) + MESSAGE_OVERHEAD_TOKENS
    }
}
