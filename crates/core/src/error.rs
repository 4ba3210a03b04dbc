//! Error types for the Hearth domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error variant.

use thiserror::Error;

/// The top-level error type for all Hearth operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Memory search errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Cheap generation errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Memory search failed: {0}")]
    SearchFailed(String),

    #[error("Memory backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Cheap generation not configured: {0}")]
    NotConfigured(String),

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Generation returned no content")]
    EmptyResponse,

    #[error("Generation output could not be interpreted: {0}")]
    InvalidOutput(String),
}
