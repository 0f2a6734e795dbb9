//! # Batch Accumulation
//!
//! A [`BatchAccumulator`] is the per-worker staging area between a
//! [`RecordSource`](crate::source::RecordSource) and a
//! [`DataSink`]. Records are buffered per destination and handed to the
//! sink in one `write_batch` call per destination when the worker decides
//! to flush.
//!
//! ## Flush rule
//!
//! A single pending counter spans all destinations of the worker. A flush
//! is due when the counter reaches the batch size or when the worker has
//! just appended the last event of its range:
//!
//! ```text
//! batch_size = 10, range of 25 single-record events
//!
//! event  0..=9   -> flush 10
//! event 10..=19  -> flush 10
//! event 20..=24  -> flush  5   (last of range)
//! ```
//!
//! `add` performs no I/O. `flush` writes every non-empty buffer with the
//! same [`WriteMode`], then clears all buffers and zeroes the counter. A
//! sink error aborts the flush and is returned as-is; retrying is the
//! sink's business.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------


// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use tracing::trace;

use crate::record::{BatchKey, Record};
use crate::sink::{DataSink, SinkError, WriteMode};

// ------------------------------------------------------------------------------------------------
// Flush predicate
// ------------------------------------------------------------------------------------------------

/// Returns `true` when a batch of `pending` records must be flushed.
///
/// Sources that emit several records per event can step past
/// `batch_size` without landing on it, so any count at or above the
/// threshold triggers.
pub fn should_flush(pending: usize, batch_size: usize, is_last_of_range: bool) -> bool {
    pending >= batch_size || is_last_of_range
}

// ------------------------------------------------------------------------------------------------
// BatchAccumulator
// ------------------------------------------------------------------------------------------------

/// Per-worker buffers keyed by destination.
#[derive(Debug)]
pub struct BatchAccumulator {
    buffers: BTreeMap<BatchKey, Vec<Record>>,
    pending: usize,
    batch_size: usize,
    flushes: u64,
}

impl BatchAccumulator {
    /// Creates an empty accumulator. A `batch_size` of zero is treated as one.
    pub fn new(batch_size: usize) -> Self {
        Self {
            buffers: BTreeMap::new(),
            pending: 0,
            batch_size: batch_size.max(1),
            flushes: 0,
        }
    }

    /// Buffers `record` for `key`.
    pub fn add(&mut self, key: BatchKey, record: Record) {
        self.buffers.entry(key).or_default().push(record);
        self.pending += 1;
    }

    /// Records buffered since the last flush, across all destinations.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Records currently buffered for `key`.
    pub fn buffered(&self, key: &BatchKey) -> usize {
        self.buffers.get(key).map_or(0, Vec::len)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Completed flushes so far.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Applies [`should_flush`] to the current state.
    pub fn should_flush(&self, is_last_of_range: bool) -> bool {
        should_flush(self.pending, self.batch_size, is_last_of_range)
    }

    /// Writes every non-empty buffer to `sink`, one call per destination,
    /// then resets all buffers and the pending counter.
    ///
    /// Returns the number of records written.
    ///
    /// # Errors
    ///
    /// The first [`SinkError`] is returned immediately. Buffers not yet
    /// written are left in place.
    pub fn flush(&mut self, sink: &mut dyn DataSink, mode: WriteMode) -> Result<usize, SinkError> {
        let mut written = 0;
        for (key, buffer) in self.buffers.iter_mut() {
            if buffer.is_empty() {
                continue;
            }
            let batch = std::mem::replace(buffer, Vec::with_capacity(self.batch_size));
            let len = batch.len();
            sink.write_batch(key, batch, mode)?;
            trace!(destination = %key, records = len, %mode, "batch flushed");
            written += len;
        }

        self.pending = 0;
        self.flushes += 1;
        Ok(written)
    }
}
