//! Null sink - discards all data.
//!
//! Measures the driver itself (generation, batching, pool overhead) without
//! any store behind it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{DataSink, Predicate, SinkError, SinkFactory, WriteMode};
use crate::record::{BatchKey, Record};

/// Factory for [`NullSink`] handles. Counts what it discarded.
#[derive(Debug, Clone, Default)]
pub struct NullStore {
    discarded: Arc<AtomicU64>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records dropped by all handles so far.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

impl SinkFactory for NullStore {
    fn open(&self) -> Result<Box<dyn DataSink>, SinkError> {
        Ok(Box::new(NullSink {
            discarded: Arc::clone(&self.discarded),
        }))
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Accepts every batch and stores nothing.
#[derive(Debug)]
pub struct NullSink {
    discarded: Arc<AtomicU64>,
}

impl DataSink for NullSink {
    fn write_batch(
        &mut self,
        _destination: &BatchKey,
        records: Vec<Record>,
        _mode: WriteMode,
    ) -> Result<(), SinkError> {
        self.discarded
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn count(&mut self, _destination: &BatchKey) -> Result<u64, SinkError> {
        Ok(0)
    }

    fn read_one(
        &mut self,
        _destination: &BatchKey,
        _predicate: &Predicate,
    ) -> Result<Option<Record>, SinkError> {
        Ok(None)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
