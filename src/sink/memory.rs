//! In-process document store.
//!
//! All handles opened from one [`MemoryStore`] share the same tables behind
//! an `Arc<RwLock<..>>`. Each [`MemorySink`] tracks its own closed state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use super::{DataSink, Predicate, SinkError, SinkFactory, WriteMode};
use crate::record::{BatchKey, Record};

#[derive(Debug, Default)]
struct StoreInner {
    tables: RwLock<HashMap<BatchKey, Vec<Record>>>,
    unavailable: AtomicBool,
    sync_batches: AtomicU64,
    async_batches: AtomicU64,
    handles_opened: AtomicU64,
    handles_closed: AtomicU64,
}

/// Counters describing traffic seen by a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStoreStats {
    pub sync_batches: u64,
    pub async_batches: u64,
    pub handles_opened: u64,
    pub handles_closed: u64,
}

/// Shared in-memory store; clones refer to the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: while unavailable, `open` and `write_batch`
    /// fail with [`SinkError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.inner.unavailable.store(!available, Ordering::Release);
    }

    /// Number of records stored in `destination`.
    pub fn len(&self, destination: &BatchKey) -> usize {
        let tables = self.inner.tables.read().unwrap();
        tables.get(destination).map_or(0, Vec::len)
    }

    /// Total number of records across all destinations.
    pub fn total_len(&self) -> usize {
        let tables = self.inner.tables.read().unwrap();
        tables.values().map(Vec::len).sum()
    }

    /// Destinations that hold at least one record, sorted by name.
    pub fn destinations(&self) -> Vec<BatchKey> {
        let tables = self.inner.tables.read().unwrap();
        let mut keys: Vec<_> = tables
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Copies every record of `destination`.
    pub fn snapshot(&self, destination: &BatchKey) -> Vec<Record> {
        let tables = self.inner.tables.read().unwrap();
        tables.get(destination).cloned().unwrap_or_default()
    }

    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            sync_batches: self.inner.sync_batches.load(Ordering::Relaxed),
            async_batches: self.inner.async_batches.load(Ordering::Relaxed),
            handles_opened: self.inner.handles_opened.load(Ordering::Relaxed),
            handles_closed: self.inner.handles_closed.load(Ordering::Relaxed),
        }
    }

    fn check_available(&self) -> Result<(), SinkError> {
        if self.inner.unavailable.load(Ordering::Acquire) {
            return Err(SinkError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

impl SinkFactory for MemoryStore {
    fn open(&self) -> Result<Box<dyn DataSink>, SinkError> {
        self.check_available()?;
        self.inner.handles_opened.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemorySink {
            store: self.clone(),
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ------------------------------------------------------------------------------------------------
// Handle
// ------------------------------------------------------------------------------------------------

/// One connection to a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySink {
    store: MemoryStore,
    closed: bool,
}

impl MemorySink {
    fn check_open(&self) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        Ok(())
    }
}

impl DataSink for MemorySink {
    fn write_batch(
        &mut self,
        destination: &BatchKey,
        records: Vec<Record>,
        mode: WriteMode,
    ) -> Result<(), SinkError> {
        self.check_open()?;
        self.store.check_available()?;

        let counter = match mode {
            WriteMode::Sync => &self.store.inner.sync_batches,
            WriteMode::Async => &self.store.inner.async_batches,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        trace!(%destination, records = records.len(), %mode, "memory batch");
        let mut tables = self.store.inner.tables.write().unwrap();
        tables
            .entry(destination.clone())
            .or_default()
            .extend(records);
        Ok(())
    }

    fn count(&mut self, destination: &BatchKey) -> Result<u64, SinkError> {
        self.check_open()?;
        Ok(self.store.len(destination) as u64)
    }

    fn read_one(
        &mut self,
        destination: &BatchKey,
        predicate: &Predicate,
    ) -> Result<Option<Record>, SinkError> {
        self.check_open()?;
        let tables = self.store.inner.tables.read().unwrap();
        Ok(tables
            .get(destination)
            .and_then(|rows| rows.iter().find(|r| predicate.matches(r)))
            .cloned())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.store.inner.handles_closed.fetch_add(1, Ordering::Relaxed);
        debug!("memory sink closed");
        Ok(())
    }
}
