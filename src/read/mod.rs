//! # Random-Read Workload
//!
//! Measures point-read latency against data left behind by an insert run.
//!
//! 1. `count` the destination. An empty destination ends the run at once
//!    with `documents == 0` and no latency figures.
//! 2. Issue `operations` lookups, each for a random event id in
//!    `[0, documents)`, matched against field `key_field`.
//! 3. Summarise per-operation latency as min / mean / percentiles / max.
//!
//! Reads run on the calling thread through a single sink handle.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::fmt;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::BenchError;
use crate::counter::{self, Stopwatch};
use crate::record::BatchKey;
use crate::sink::{Predicate, ScopedSink, SinkFactory};
use crate::source::LogEventSource;

// ------------------------------------------------------------------------------------------------
// Configuration
// ------------------------------------------------------------------------------------------------

/// Configuration for a random-read run.
#[derive(Debug, Clone)]
pub struct ReadConfig {
    /// Number of point reads.
    ///
    /// Default: 1000. Must be ≥ 1.
    pub operations: u64,

    /// Destination to read from.
    ///
    /// Default: `events`.
    pub destination: BatchKey,

    /// Field compared against the random id.
    ///
    /// Default: 0, the event id.
    pub key_field: usize,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            operations: 1000,
            destination: LogEventSource::DESTINATION,
            key_field: 0,
        }
    }
}

impl ReadConfig {
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.operations < 1 {
            return Err(BenchError::InvalidConfig("operations must be >= 1".into()));
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Latency statistics
// ------------------------------------------------------------------------------------------------

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Upper bound on latency samples reserved up front; larger runs grow the
/// buffer as they go.
const MAX_PREALLOCATED_SAMPLES: usize = 1 << 20;

fn sample_capacity(operations: u64) -> usize {
    usize::try_from(operations).map_or(MAX_PREALLOCATED_SAMPLES, |n| {
        n.min(MAX_PREALLOCATED_SAMPLES)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyStats {
    pub min: Duration,
    pub mean: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub max: Duration,
}

impl LatencyStats {
    /// Summarises `samples`; `None` if there are none.
    pub fn from_samples(mut samples: Vec<Duration>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable();

        Some(Self {
            min: samples[0],
            mean: mean(&samples),
            p50: percentile(&samples, 50.0),
            p95: percentile(&samples, 95.0),
            p99: percentile(&samples, 99.0),
            max: samples[samples.len() - 1],
        })
    }
}

/// Arithmetic mean of a non-empty slice, summed in `u128` nanoseconds so
/// neither the total nor the sample count can overflow.
fn mean(samples: &[Duration]) -> Duration {
    let total: u128 = samples.iter().map(Duration::as_nanos).sum();
    let nanos = total / samples.len() as u128;
    Duration::new(
        (nanos / NANOS_PER_SEC) as u64,
        (nanos % NANOS_PER_SEC) as u32,
    )
}

/// Nearest-rank percentile of an ascending, non-empty slice.
fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let rank = (p * sorted.len() as f64 / 100.0).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

// ------------------------------------------------------------------------------------------------
// Report
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReadReport {
    /// Record count of the destination when the run started.
    pub documents: u64,
    pub operations: u64,
    pub hits: u64,
    pub misses: u64,
    pub elapsed: Duration,
    /// `None` when no reads were issued.
    pub latency: Option<LatencyStats>,
}

impl ReadReport {
    /// Reads per second of wall-clock time.
    pub fn throughput(&self) -> f64 {
        counter::rate(self.operations, self.elapsed)
    }
}

impl fmt::Display for ReadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reads over {} documents in {:.3}s, {:.0} reads/s, {} hits, {} misses",
            self.operations,
            self.documents,
            self.elapsed.as_secs_f64(),
            self.throughput(),
            self.hits,
            self.misses,
        )?;
        if let Some(l) = &self.latency {
            write!(
                f,
                ", latency min {:?} p50 {:?} p95 {:?} p99 {:?} max {:?}",
                l.min, l.p50, l.p95, l.p99, l.max
            )?;
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Benchmark
// ------------------------------------------------------------------------------------------------

/// Runs random point reads against one store.
pub struct ReadBenchmark<'a> {
    sinks: &'a dyn SinkFactory,
    config: ReadConfig,
}

impl<'a> ReadBenchmark<'a> {
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidConfig`] if `config` fails validation.
    pub fn new(sinks: &'a dyn SinkFactory, config: ReadConfig) -> Result<Self, BenchError> {
        config.validate()?;
        Ok(Self { sinks, config })
    }

    /// Executes the run.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::Sink`] if the handle cannot be opened or a
    /// query fails.
    pub fn run(&self) -> Result<ReadReport, BenchError> {
        let destination = &self.config.destination;
        let mut sink = ScopedSink::open(self.sinks, 0)?;
        let documents = sink.as_mut().count(destination)?;

        if documents == 0 {
            warn!(%destination, sink = self.sinks.name(), "no documents to read");
            sink.close()?;
            return Ok(ReadReport {
                documents,
                operations: 0,
                hits: 0,
                misses: 0,
                elapsed: Duration::ZERO,
                latency: None,
            });
        }

        info!(
            %destination,
            documents,
            operations = self.config.operations,
            "read run started"
        );

        let mut rng = rand::rng();
        let mut samples = Vec::with_capacity(sample_capacity(self.config.operations));
        let mut hits = 0;
        let stopwatch = Stopwatch::start();

        for _ in 0..self.config.operations {
            let predicate = Predicate::FieldEquals {
                field: self.config.key_field,
                value: rng.random_range(0..documents).to_string(),
            };
            let op = Stopwatch::start();
            let found = sink.as_mut().read_one(destination, &predicate)?;
            samples.push(op.elapsed());
            if found.is_some() {
                hits += 1;
            }
        }

        let elapsed = stopwatch.elapsed();
        sink.close()?;

        let report = ReadReport {
            documents,
            operations: self.config.operations,
            hits,
            misses: self.config.operations - hits,
            elapsed,
            latency: LatencyStats::from_samples(samples),
        };
        info!(%report, "read run finished");
        Ok(report)
    }
}
