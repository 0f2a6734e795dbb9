//! # Concurrent Insert Orchestrator
//!
//! Runs one insert benchmark: partitions the event count, starts a fixed
//! pool of worker threads, submits one job per range, then closes the job
//! queue and joins every thread.
//!
//! ## Worker pool
//!
//! The pool is a set of named threads sharing a `crossbeam` job channel.
//! Dropping the sender is the shutdown signal: each thread drains the
//! remaining jobs and exits, and the orchestrator blocks on `join` for
//! each of them. Results flow back over a second channel.
//!
//! ## Failures
//!
//! Under [`FailurePolicy::Drain`] a failing worker does not affect the
//! others. Under [`FailurePolicy::Cancel`] the first failure trips a shared
//! [`CancelToken`] and the remaining workers stop before their next event.
//! Either way the run is fully drained before it returns, and the
//! [`InsertReport`] keeps `completed` apart from `requested`.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------


// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::counter::{self, CancelToken, CompletionCounter, Stopwatch};
use crate::partition::{self, EventRange};
use crate::sink::SinkFactory;
use crate::source::RecordSource;
use crate::worker::{self, WorkerContext, WorkerStats};
use crate::{BenchConfig, BenchError, FailurePolicy};

type Job = Box<dyn FnOnce() + Send>;
type JobResult = (usize, Result<WorkerStats, BenchError>);

// ------------------------------------------------------------------------------------------------
// Worker pool
// ------------------------------------------------------------------------------------------------

/// Fixed-size thread pool fed through an unbounded job channel.
struct WorkerPool {
    sender: Sender<Job>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    fn new(size: usize) -> Result<Self, BenchError> {
        let (sender, receiver) = channel::unbounded::<Job>();

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let rx = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("nosqlbench-worker-{id}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        job();
                    }
                })
                .map_err(BenchError::Spawn)?;
            workers.push(handle);
        }
        // Workers hold their own receiver clones; drop ours.
        drop(receiver);

        Ok(Self { sender, workers })
    }

    /// Queues `job`. Fails only when every pool thread has already exited,
    /// which happens if all of them panicked.
    fn submit(&self, job: Job) -> Result<(), Job> {
        self.sender.send(job).map_err(|e| e.into_inner())
    }

    /// Closes the queue and blocks until every thread has exited.
    /// Returns the number of threads that panicked.
    fn shutdown(self) -> usize {
        drop(self.sender);
        let mut panicked = 0;
        for worker in self.workers {
            if worker.join().is_err() {
                panicked += 1;
            }
        }
        panicked
    }
}

// ------------------------------------------------------------------------------------------------
// Report
// ------------------------------------------------------------------------------------------------

/// Outcome of one insert run.
#[derive(Debug)]
pub struct InsertReport {
    /// Events the run was asked to insert.
    pub requested: u64,

    /// Final value of the completion counter.
    pub completed: u64,

    /// Wall-clock time from dispatch to pool drain.
    pub elapsed: Duration,

    /// Stats of every successful worker, ordered by worker id.
    pub workers: Vec<WorkerStats>,

    /// Number of workers that returned an error or panicked.
    pub failed_workers: usize,

    /// The first non-cancellation error, if any worker failed.
    pub first_error: Option<BenchError>,

    /// Rate hint from the configuration, echoed for reporting.
    pub events_per_second_hint: Option<u64>,
}

impl InsertReport {
    /// `true` if every requested event was inserted.
    pub fn is_complete(&self) -> bool {
        self.first_error.is_none() && self.completed == self.requested
    }

    /// Completed events per second of wall-clock time.
    pub fn throughput(&self) -> f64 {
        counter::rate(self.completed, self.elapsed)
    }

    /// Records written across all successful workers.
    pub fn records_written(&self) -> u64 {
        self.workers.iter().map(|w| w.records).sum()
    }

    /// Converts a failed run into [`BenchError::Incomplete`].
    pub fn into_result(self) -> Result<Self, BenchError> {
        match self.first_error {
            None => Ok(self),
            Some(cause) => Err(BenchError::Incomplete {
                completed: self.completed,
                requested: self.requested,
                cause: Box::new(cause),
            }),
        }
    }
}

impl fmt::Display for InsertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inserted {}/{} events ({} records) in {:.3}s, {:.0} events/s, {} workers, {} failed",
            self.completed,
            self.requested,
            self.records_written(),
            self.elapsed.as_secs_f64(),
            self.throughput(),
            self.workers.len() + self.failed_workers,
            self.failed_workers,
        )?;
        if let Some(hint) = self.events_per_second_hint {
            write!(f, " (target {hint} events/s)")?;
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Orchestrator
// ------------------------------------------------------------------------------------------------

/// Drives concurrent insert runs against one sink factory.
pub struct InsertOrchestrator {
    config: BenchConfig,
    source: Arc<dyn RecordSource>,
    sinks: Arc<dyn SinkFactory>,
}

impl fmt::Debug for InsertOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertOrchestrator")
            .field("config", &self.config)
            .field("source", &self.source.name())
            .field("sink", &self.sinks.name())
            .finish()
    }
}

impl InsertOrchestrator {
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        config: BenchConfig,
        source: Arc<dyn RecordSource>,
        sinks: Arc<dyn SinkFactory>,
    ) -> Result<Self, BenchError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            sinks,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Inserts `total_events` events and fails if any worker failed.
    ///
    /// # Errors
    ///
    /// - [`BenchError::InvalidPartition`] before any thread is started.
    /// - [`BenchError::Incomplete`] after the pool has drained, carrying
    ///   the completed count and the first worker error.
    pub fn run(&self, total_events: u64) -> Result<InsertReport, BenchError> {
        self.run_report(total_events)?.into_result()
    }

    /// Inserts `total_events` events and always returns a report once the
    /// pool has drained, even if workers failed.
    ///
    /// # Errors
    ///
    /// Only errors raised before dispatch: [`BenchError::InvalidPartition`]
    /// and [`BenchError::Spawn`].
    pub fn run_report(&self, total_events: u64) -> Result<InsertReport, BenchError> {
        let ranges = partition::partition(total_events, self.config.worker_count)?;

        info!(
            total_events,
            workers = ranges.len(),
            batch_size = self.config.batch_size,
            mode = %self.config.write_mode,
            source = self.source.name(),
            sink = self.sinks.name(),
            "insert run started"
        );
        if let Some(hint) = self.config.events_per_second {
            info!(events_per_second = hint, "rate hint recorded, not enforced");
        }

        let ctx = WorkerContext {
            source: Arc::clone(&self.source),
            sinks: Arc::clone(&self.sinks),
            counter: CompletionCounter::new(),
            cancel: CancelToken::new(),
            batch_size: self.config.batch_size,
            write_mode: self.config.write_mode,
        };

        let stopwatch = Stopwatch::start();
        let pool = WorkerPool::new(self.config.worker_count)?;
        let (result_tx, result_rx) = channel::unbounded::<JobResult>();

        for (id, range) in ranges.iter().copied().enumerate() {
            let job = self.job(id, range, ctx.clone(), result_tx.clone());
            if pool.submit(job).is_err() {
                error!(worker = id, %range, "no live pool thread, job not dispatched");
                let _ = result_tx.send((id, Err(BenchError::NotDispatched { worker: id })));
            }
        }
        drop(result_tx);

        let panicked = pool.shutdown();
        let elapsed = stopwatch.elapsed();
        if panicked > 0 {
            warn!(panicked, "worker threads panicked");
        }

        let report = collect(
            &ranges,
            result_rx,
            total_events,
            ctx.counter.get(),
            elapsed,
            self.config.events_per_second,
        );
        if report.is_complete() {
            info!(%report, "insert run finished");
        } else {
            error!(%report, "insert run incomplete");
        }
        Ok(report)
    }

    fn job(
        &self,
        id: usize,
        range: EventRange,
        ctx: WorkerContext,
        results: Sender<JobResult>,
    ) -> Job {
        let cancel_on_failure = self.config.failure_policy == FailurePolicy::Cancel;
        Box::new(move || {
            let result = worker::run_worker(id, range, &ctx);
            if let Err(e) = &result {
                match e {
                    BenchError::Cancelled { .. } => debug!(worker = id, "worker stopped: {e}"),
                    _ => {
                        error!(worker = id, %range, "worker failed: {e}");
                        if cancel_on_failure && ctx.cancel.cancel() {
                            warn!(worker = id, "cancelling remaining workers");
                        }
                    }
                }
            }
            let _ = results.send((id, result));
        })
    }
}

/// Folds worker results into a report. Workers with no result panicked;
/// jobs that never reached a thread report [`BenchError::NotDispatched`].
fn collect(
    ranges: &[EventRange],
    results: Receiver<JobResult>,
    requested: u64,
    completed: u64,
    elapsed: Duration,
    events_per_second_hint: Option<u64>,
) -> InsertReport {
    let mut workers = Vec::new();
    let mut failed_workers = 0;
    let mut first_error = None;
    let mut reported = vec![false; ranges.len()];

    // Arrival order, so the first error is the earliest one.
    for (id, outcome) in results.try_iter() {
        reported[id] = true;
        match outcome {
            Ok(stats) => workers.push(stats),
            Err(e) => {
                failed_workers += 1;
                keep_first(&mut first_error, e);
            }
        }
    }
    for (id, _) in reported.iter().enumerate().filter(|(_, seen)| !**seen) {
        failed_workers += 1;
        keep_first(&mut first_error, BenchError::WorkerPanicked { worker: id });
    }
    workers.sort_by_key(|w| w.worker);

    InsertReport {
        requested,
        completed,
        elapsed,
        workers,
        failed_workers,
        first_error,
        events_per_second_hint,
    }
}

/// A cancellation never hides the failure that caused it.
fn keep_first(slot: &mut Option<BenchError>, e: BenchError) {
    let replace = match slot {
        None => true,
        Some(BenchError::Cancelled { .. }) => !matches!(e, BenchError::Cancelled { .. }),
        Some(_) => false,
    };
    if replace {
        *slot = Some(e);
    }
}
