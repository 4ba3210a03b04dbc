//! Storage implementations for Hearth.
//!
//! Chats and memories are owned by the host application; these backends
//! cover tests, fixtures and ephemeral sessions.

pub mod chat;
pub mod memory;
pub mod noop;

pub use chat::InMemoryChatStore;
pub use memory::{InMemoryMemoryStore, StoredMemory};
pub use noop::NoopMemorySearch;
