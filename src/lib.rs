// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! piyo: a durable, time-ordered log of life events.
//!
//! Writes go to a write-ahead log first and then into an in-memory index
//! sorted by `(start, actor, category)`. Reads are served from memory.

pub mod error;
pub mod event;
pub mod index;
pub mod select;
pub mod store;
pub mod wal;

pub use error::{Result, StoreError};
pub use event::Event;
pub use index::EventIndex;
pub use select::Select;
pub use store::{InMemoryStore, Store, WalStore};
pub use wal::{CompactStats, LogRecord, Wal, WalOptions};

#[cfg(test)]
pub mod tests;
