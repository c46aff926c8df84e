//! Search history for Skycast.
//!
//! Bounded, location-deduplicated history with single-step undo of removals.

pub mod error;
pub mod history;
pub mod storage;
pub mod store;

pub use error::StorageError;
pub use history::{HistoryItem, HistorySnapshot};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use store::HistoryStore;
