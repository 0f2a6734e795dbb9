//! nosqlbench - concurrent insert and random-read benchmarks
//!
//! # Usage
//!
//! ```bash
//! # 1M log events into the in-memory store, 8 workers
//! nosqlbench --events 1000000 --workers 8
//!
//! # Streaming activity into column files, async writes, then read back
//! nosqlbench --sink file --dir /tmp/bench --source streaming --async --mode both
//!
//! # Read-only run over files left by an earlier insert
//! nosqlbench --sink file --dir /tmp/bench --mode read --reads 5000
//! ```
//!
//! Exit status is 1 if the insert phase fails and 0 otherwise, including a
//! read run that finds no documents.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nosqlbench::sink::{FileStore, MemoryStore, NullStore};
use nosqlbench::source::{CustomerPool, LogEventSource, StreamingSource};
use nosqlbench::{
    BenchConfig, BenchError, FailurePolicy, InsertOrchestrator, ReadBenchmark, ReadConfig,
    RecordSource, SinkFactory, WriteMode,
};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SinkKind {
    Memory,
    File,
    Null,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Log,
    Streaming,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Insert,
    Read,
    Both,
}

/// Concurrent batched-insert and random-read benchmarks for NoSQL stores
#[derive(Parser, Debug)]
#[command(name = "nosqlbench")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Target store
    #[arg(long, value_enum, default_value_t = SinkKind::Memory)]
    sink: SinkKind,

    /// Directory for the file sink
    #[arg(long, default_value = "nosqlbench-data")]
    dir: PathBuf,

    /// Synthetic data generator
    #[arg(long, value_enum, default_value_t = SourceKind::Log)]
    source: SourceKind,

    /// Workload to run
    #[arg(short, long, value_enum, default_value_t = Mode::Insert)]
    mode: Mode,

    /// Total events to insert
    #[arg(short, long, default_value_t = 100_000)]
    events: u64,

    /// Worker threads, one event range each
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Records per batch
    #[arg(short, long, default_value_t = 1000)]
    batch_size: usize,

    /// Do not wait for durability on each batch
    #[arg(long = "async")]
    async_writes: bool,

    /// Target rate, reported only
    #[arg(long)]
    events_per_second: Option<u64>,

    /// Stop remaining workers after the first failure
    #[arg(long)]
    cancel_on_failure: bool,

    /// Random point reads in read mode
    #[arg(short, long, default_value_t = 1000)]
    reads: u64,

    /// Customer reference rows for the streaming source
    #[arg(long, default_value_t = 1000)]
    customers: usize,

    /// Log level (trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Cli {
    fn bench_config(&self) -> BenchConfig {
        BenchConfig {
            worker_count: self.workers,
            batch_size: self.batch_size,
            write_mode: if self.async_writes {
                WriteMode::Async
            } else {
                WriteMode::Sync
            },
            events_per_second: self.events_per_second,
            failure_policy: if self.cancel_on_failure {
                FailurePolicy::Cancel
            } else {
                FailurePolicy::Drain
            },
        }
    }

    fn read_config(&self) -> ReadConfig {
        let destination = match self.source {
            SourceKind::Log => LogEventSource::DESTINATION,
            SourceKind::Streaming => StreamingSource::WATCH_HISTORY,
        };
        ReadConfig {
            operations: self.reads,
            destination,
            key_field: 0,
        }
    }

    fn sinks(&self) -> Result<Arc<dyn SinkFactory>, BenchError> {
        let sinks: Arc<dyn SinkFactory> = match self.sink {
            SinkKind::Memory => Arc::new(MemoryStore::new()),
            SinkKind::File => Arc::new(FileStore::open(&self.dir)?),
            SinkKind::Null => Arc::new(NullStore::new()),
        };
        Ok(sinks)
    }

    fn source(&self) -> Arc<dyn RecordSource> {
        match self.source {
            SourceKind::Log => Arc::new(LogEventSource::default()),
            SourceKind::Streaming => Arc::new(StreamingSource::new(
                CustomerPool::generate(self.customers),
                10_000,
            )),
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_insert(cli: &Cli, sinks: Arc<dyn SinkFactory>) -> Result<(), BenchError> {
    let bench = InsertOrchestrator::new(cli.bench_config(), cli.source(), sinks)?;
    let report = bench.run(cli.events)?;
    println!("{report}");
    Ok(())
}

fn run_read(cli: &Cli, sinks: &dyn SinkFactory) -> Result<(), BenchError> {
    let report = ReadBenchmark::new(sinks, cli.read_config())?.run()?;
    if report.documents == 0 {
        info!("nothing to read, exiting");
        return Ok(());
    }
    println!("{report}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let sinks = match cli.sinks() {
        Ok(sinks) => sinks,
        Err(e) => {
            error!("cannot open sink: {e}");
            return ExitCode::FAILURE;
        }
    };

    if matches!(cli.mode, Mode::Insert | Mode::Both) {
        if let Err(e) = run_insert(&cli, Arc::clone(&sinks)) {
            error!("insert failed: {e}");
            if let Some(cause) = std::error::Error::source(&e) {
                error!("caused by: {cause}");
            }
            return ExitCode::FAILURE;
        }
    }

    if matches!(cli.mode, Mode::Read | Mode::Both) {
        if let Err(e) = run_read(&cli, sinks.as_ref()) {
            error!("read failed: {e}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
