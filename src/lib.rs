//! # nosqlbench
//!
//! A benchmarking harness for NoSQL data stores. It generates synthetic
//! log and activity events, inserts them into a target store from a fixed
//! pool of worker threads, and measures insert throughput and random-read
//! latency.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nosqlbench::{BenchConfig, InsertOrchestrator};
//! use nosqlbench::sink::MemoryStore;
//! use nosqlbench::source::LogEventSource;
//!
//! let store = MemoryStore::new();
//! let bench = InsertOrchestrator::new(
//!     BenchConfig { worker_count: 4, batch_size: 500, ..BenchConfig::default() },
//!     Arc::new(LogEventSource::default()),
//!     Arc::new(store.clone()),
//! )
//! .unwrap();
//!
//! let report = bench.run(100_000).unwrap();
//! assert_eq!(report.completed, 100_000);
//! println!("{report}");
//! ```
//!
//! ## Insert pipeline
//!
//! ```text
//! InsertOrchestrator
//!   └─ partition(total, workers) ─┬─ worker 0: [0, n)      ─┐
//!                                 ├─ worker 1: [n, 2n)     ─┤  RecordSource
//!                                 └─ worker k: [kn, total) ─┘  → BatchAccumulator
//!                                                             → DataSink
//!                                                             → CompletionCounter
//! ```
//!
//! - Every worker owns its event range, its batches and its sink handle.
//! - The [`CompletionCounter`] is the only state shared between workers.
//! - A worker adds its range length to the counter only after its last
//!   batch was written and its handle closed.

pub mod batch;
pub mod counter;
pub mod orchestrator;
pub mod partition;
pub mod read;
pub mod record;
pub mod sink;
pub mod source;
pub mod worker;

use std::io;

use thiserror::Error;

pub use counter::{CancelToken, CompletionCounter};
pub use orchestrator::{InsertOrchestrator, InsertReport};
pub use partition::EventRange;
pub use read::{ReadBenchmark, ReadConfig, ReadReport};
pub use record::{BatchKey, Record, RecordGroup};
pub use sink::{DataSink, SinkError, SinkFactory, WriteMode};
pub use source::{GenerationError, RecordSource};

// ------------------------------------------------------------------------------------------------
// Configuration
// ------------------------------------------------------------------------------------------------

/// What the orchestrator does with the other workers once one fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Let every other worker run to completion, then report the first
    /// error.
    #[default]
    Drain,

    /// Ask the other workers to stop before their next event.
    Cancel,
}

/// Configuration for an insert run.
///
/// All fields have sensible defaults via [`BenchConfig::default()`].
/// The configuration is validated by [`InsertOrchestrator::new`].
///
/// # Example
///
/// ```rust
/// use nosqlbench::{BenchConfig, WriteMode};
///
/// let config = BenchConfig {
///     worker_count: 8,
///     write_mode: WriteMode::Async,
///     ..BenchConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Size of the worker pool; also the number of event ranges.
    ///
    /// Default: 4. Must be ≥ 1.
    pub worker_count: usize,

    /// Records buffered per worker before a flush.
    ///
    /// Default: 1000. Must be ≥ 1.
    pub batch_size: usize,

    /// Write mode passed to every `write_batch` call.
    ///
    /// Default: [`WriteMode::Sync`].
    pub write_mode: WriteMode,

    /// Target rate, reported alongside the results. It is not enforced:
    /// workers insert as fast as the sink accepts.
    ///
    /// Default: `None`. Must be ≥ 1 when set.
    pub events_per_second: Option<u64>,

    /// Default: [`FailurePolicy::Drain`].
    pub failure_policy: FailurePolicy,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            batch_size: 1000,
            write_mode: WriteMode::Sync,
            events_per_second: None,
            failure_policy: FailurePolicy::Drain,
        }
    }
}

impl BenchConfig {
    /// Validates all configuration parameters.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.worker_count < 1 {
            return Err(BenchError::InvalidConfig(
                "worker_count must be >= 1".into(),
            ));
        }
        if self.batch_size < 1 {
            return Err(BenchError::InvalidConfig("batch_size must be >= 1".into()));
        }
        if self.events_per_second == Some(0) {
            return Err(BenchError::InvalidConfig(
                "events_per_second must be >= 1 when set".into(),
            ));
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors returned by benchmark runs.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid configuration parameter.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The event count cannot be split across the requested workers.
    #[error("cannot split {total_events} events across {worker_count} workers")]
    InvalidPartition {
        total_events: u64,
        worker_count: usize,
    },

    /// A sink failed to open, write or close.
    #[error("sink: {0}")]
    Sink(#[from] SinkError),

    /// A record source produced unusable data.
    #[error("generation: {0}")]
    Generation(#[from] GenerationError),

    /// The worker stopped early because another worker failed.
    #[error("worker {worker} cancelled")]
    Cancelled { worker: usize },

    /// The worker thread panicked before reporting a result.
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    /// The job was never handed to a thread because every pool thread had
    /// already exited.
    #[error("worker {worker} never ran: no live pool thread")]
    NotDispatched { worker: usize },

    /// A pool thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// At least one worker failed; `cause` is the first failure.
    #[error("run incomplete: {completed} of {requested} events inserted")]
    Incomplete {
        completed: u64,
        requested: u64,
        #[source]
        cause: Box<BenchError>,
    },
}
