//! # Hearth Core
//!
//! Domain types, collaborator traits, and error definitions for Hearth,
//! the context-assembly engine behind character chats.
//! This crate has **zero framework dependencies**: it defines the domain
//! model that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (token estimation, memory search, cheap
//! generation, chat storage) is a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/in-memory implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod character;
pub mod chat;
pub mod error;
pub mod generation;
pub mod memory;
pub mod message;
pub mod token;

// Re-export key types at crate root for ergonomics
pub use character::{Character, Persona};
pub use chat::{ChatMetadata, ChatStore, ChatUpdate};
pub use error::{Error, Result};
pub use generation::{CheapGenerator, CheapTask, Generation, TitleVerdict, Usage};
pub use memory::{MemorySearch, MemorySearchOptions, ScoredMemory};
pub use message::{ChatEvent, ContextMessage, EventKind, MessageMetadata, Role, render_transcript};
pub use token::{MESSAGE_OVERHEAD_TOKENS, TokenEstimator};
