//! # Insert Worker
//!
//! One worker drives one [`EventRange`] from start to finish:
//!
//! 1. Open a sink handle ([`ScopedSink`]).
//! 2. For every index in increasing order, generate the event's records and
//!    buffer them in a [`BatchAccumulator`].
//! 3. After each event, flush if the batch is full or the range is done.
//! 4. Close the handle, then add the range length to the shared
//!    [`CompletionCounter`].
//!
//! Any error ends the worker at once. Its events are then not counted,
//! and the sink handle is still closed exactly once by the guard.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------


// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::BenchError;
use crate::batch::BatchAccumulator;
use crate::counter::{CancelToken, CompletionCounter, Stopwatch};
use crate::partition::EventRange;
use crate::sink::{ScopedSink, SinkFactory, WriteMode};
use crate::source::RecordSource;

// ------------------------------------------------------------------------------------------------
// Types
// ------------------------------------------------------------------------------------------------

/// Everything a worker needs besides its range. Cloned into each worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub source: Arc<dyn RecordSource>,
    pub sinks: Arc<dyn SinkFactory>,
    pub counter: CompletionCounter,
    pub cancel: CancelToken,
    pub batch_size: usize,
    pub write_mode: WriteMode,
}

/// What one successful worker did.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerStats {
    pub worker: usize,
    pub range: EventRange,
    /// Events generated; equals `range.len()`.
    pub events: u64,
    /// Records written; larger than `events` for fan-out sources.
    pub records: u64,
    pub flushes: u64,
    pub elapsed: Duration,
}

// ------------------------------------------------------------------------------------------------
// Worker
// ------------------------------------------------------------------------------------------------

/// Runs worker `worker` over `range`.
///
/// # Errors
///
/// - [`BenchError::Sink`] if the handle cannot be opened, a batch write
///   fails, or the final close fails.
/// - [`BenchError::Generation`] if the source rejects an index.
/// - [`BenchError::Cancelled`] if `ctx.cancel` was tripped mid-range.
pub fn run_worker(
    worker: usize,
    range: EventRange,
    ctx: &WorkerContext,
) -> Result<WorkerStats, BenchError> {
    let stopwatch = Stopwatch::start();
    let mut sink = ScopedSink::open(ctx.sinks.as_ref(), worker)?;
    let mut batches = BatchAccumulator::new(ctx.batch_size);
    let mut records = 0u64;

    debug!(worker, %range, source = ctx.source.name(), "worker started");

    for index in range.indices() {
        if ctx.cancel.is_cancelled() {
            debug!(worker, index, "worker cancelled");
            return Err(BenchError::Cancelled { worker });
        }

        for (key, record) in ctx.source.generate(index)? {
            batches.add(key, record);
        }

        if batches.should_flush(range.is_last(index)) {
            records += batches.flush(sink.as_mut(), ctx.write_mode)? as u64;
            trace!(worker, index, records, "flushed");
        }
    }

    sink.close()?;
    let total = ctx.counter.add(range.len());

    let stats = WorkerStats {
        worker,
        range,
        events: range.len(),
        records,
        flushes: batches.flushes(),
        elapsed: stopwatch.elapsed(),
    };
    debug!(
        worker,
        events = stats.events,
        records,
        flushes = stats.flushes,
        completed_so_far = total,
        "worker finished"
    );
    Ok(stats)
}
