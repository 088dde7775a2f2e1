// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable Store
//!
//! `Store` is the read/write/delete surface the boundary layer talks to.
//! - `InMemoryStore`: an `EventIndex` behind a reader/writer lock
//! - `WalStore`: log-then-apply over an `InMemoryStore`
//!
//! The WAL lock and the index lock are taken one after the other, never
//! nested. Per operation the WAL append always happens first, so the log is a
//! superset of what any reader can observe.

use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Result, StoreError};
use crate::event::Event;
use crate::index::EventIndex;
use crate::wal::{CompactStats, Wal, WalOptions};

pub trait Store: Send + Sync {
    /// Events with start in `[from, to]` (unix seconds), in index order.
    fn read(&self, from: i64, to: i64) -> Result<Vec<Event>>;

    fn write(&self, event: Event) -> Result<()>;

    /// No-op if `id` is absent.
    fn delete(&self, id: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    index: RwLock<EventIndex>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_index(index: EventIndex) -> Self {
        Self {
            index: RwLock::new(index),
        }
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, EventIndex>> {
        self.index
            .read()
            .map_err(|_| StoreError::LockPoisoned("index"))
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, EventIndex>> {
        self.index
            .write()
            .map_err(|_| StoreError::LockPoisoned("index"))
    }

    /// Copy of the full ordered sequence.
    pub fn list(&self) -> Result<Vec<Event>> {
        Ok(self.read_guard()?.list().to_vec())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read_guard()?.len())
    }

    /// Copy of the whole index.
    pub fn snapshot(&self) -> Result<EventIndex> {
        Ok(self.read_guard()?.clone())
    }
}

impl Store for InMemoryStore {
    fn read(&self, from: i64, to: i64) -> Result<Vec<Event>> {
        Ok(self.read_guard()?.query(from, to).to_vec())
    }

    fn write(&self, event: Event) -> Result<()> {
        self.write_guard()?.upsert(event);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.write_guard()?.delete(id);
        Ok(())
    }
}

/// WAL-backed store. Reads never touch the log.
pub struct WalStore {
    wal: Wal,
    memory: InMemoryStore,
}

impl WalStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, WalOptions::default())
    }

    /// Opens the log (compacting it), then seeds memory from the replay.
    pub fn open_with(path: impl AsRef<Path>, options: WalOptions) -> Result<Self> {
        let (wal, index) = Wal::open_replayed(path, options)?;
        tracing::info!(events = index.len(), "Store recovered from WAL");
        Ok(Self {
            wal,
            memory: InMemoryStore::from_index(index),
        })
    }

    pub fn wal(&self) -> &Wal {
        &self.wal
    }

    pub fn memory(&self) -> &InMemoryStore {
        &self.memory
    }

    /// Compacts the log. Memory is untouched: it already equals the replay.
    pub fn compact(&self) -> Result<CompactStats> {
        self.wal.compact()
    }
}

impl Store for WalStore {
    fn read(&self, from: i64, to: i64) -> Result<Vec<Event>> {
        self.memory.read(from, to)
    }

    fn write(&self, event: Event) -> Result<()> {
        self.wal.write(&event)?;
        self.memory.write(event)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.wal.delete(id)?;
        self.memory.delete(id)
    }
}
