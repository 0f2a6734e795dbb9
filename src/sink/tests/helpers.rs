use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::record::{BatchKey, Record};
use crate::sink::{DataSink, Predicate, SinkError, SinkFactory, WriteMode};

/// Initialize tracing subscriber controlled by `RUST_LOG` env var.
/// Safe to call multiple times; only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A single `write_batch` call observed by a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    pub handle: usize,
    pub destination: BatchKey,
    pub records: Vec<Record>,
    pub mode: WriteMode,
}

/// Everything the handles of a [`RecordingStore`] were asked to do.
#[derive(Debug, Default)]
pub struct RecordingLog {
    pub opened: usize,
    pub close_calls: Vec<usize>,
    pub batches: Vec<BatchCall>,
}

/// Test double that records every sink call and can fail on demand.
#[derive(Debug, Clone, Default)]
pub struct RecordingStore {
    pub log: Arc<Mutex<RecordingLog>>,
    /// Fail the n-th (1-based) `write_batch` of every handle.
    pub fail_on_batch: Option<usize>,
    /// Fail only handles whose id is in this list (all handles if empty).
    pub failing_handles: Vec<usize>,
    pub fail_on_open: bool,
    /// Sleep inside every `write_batch`.
    pub write_delay: Duration,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on_batch(n: usize) -> Self {
        Self {
            fail_on_batch: Some(n),
            ..Self::default()
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        let log = self.log.lock().unwrap();
        log.batches.iter().map(|b| b.records.len()).collect()
    }

    pub fn close_calls(&self) -> Vec<usize> {
        self.log.lock().unwrap().close_calls.clone()
    }

    pub fn opened(&self) -> usize {
        self.log.lock().unwrap().opened
    }

    pub fn records_written(&self) -> usize {
        let log = self.log.lock().unwrap();
        log.batches.iter().map(|b| b.records.len()).sum()
    }
}

impl SinkFactory for RecordingStore {
    fn open(&self) -> Result<Box<dyn DataSink>, SinkError> {
        if self.fail_on_open {
            return Err(SinkError::Unavailable("recording store refused".into()));
        }
        let mut log = self.log.lock().unwrap();
        let handle = log.opened;
        log.opened += 1;

        let fails = self.failing_handles.is_empty() || self.failing_handles.contains(&handle);
        Ok(Box::new(RecordingSink {
            handle,
            log: Arc::clone(&self.log),
            fail_on_batch: if fails { self.fail_on_batch } else { None },
            write_delay: self.write_delay,
            batches: 0,
        }))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub struct RecordingSink {
    handle: usize,
    log: Arc<Mutex<RecordingLog>>,
    fail_on_batch: Option<usize>,
    write_delay: Duration,
    batches: usize,
}

impl DataSink for RecordingSink {
    fn write_batch(
        &mut self,
        destination: &BatchKey,
        records: Vec<Record>,
        mode: WriteMode,
    ) -> Result<(), SinkError> {
        self.batches += 1;
        if !self.write_delay.is_zero() {
            thread::sleep(self.write_delay);
        }
        if self.fail_on_batch == Some(self.batches) {
            return Err(SinkError::Write {
                destination: destination.to_string(),
                reason: format!("injected failure on batch {}", self.batches),
            });
        }
        self.log.lock().unwrap().batches.push(BatchCall {
            handle: self.handle,
            destination: destination.clone(),
            records,
            mode,
        });
        Ok(())
    }

    fn count(&mut self, destination: &BatchKey) -> Result<u64, SinkError> {
        let log = self.log.lock().unwrap();
        Ok(log
            .batches
            .iter()
            .filter(|b| &b.destination == destination)
            .map(|b| b.records.len() as u64)
            .sum())
    }

    fn read_one(
        &mut self,
        destination: &BatchKey,
        predicate: &Predicate,
    ) -> Result<Option<Record>, SinkError> {
        let log = self.log.lock().unwrap();
        Ok(log
            .batches
            .iter()
            .filter(|b| &b.destination == destination)
            .flat_map(|b| b.records.iter())
            .find(|r| predicate.matches(r))
            .cloned())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.log.lock().unwrap().close_calls.push(self.handle);
        Ok(())
    }
}

pub fn record(id: u64) -> Record {
    Record::from_iter([id.to_string(), format!("payload-{id}")])
}
