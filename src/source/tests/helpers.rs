use std::sync::atomic::{AtomicU64, Ordering};

use crate::record::{BatchKey, Record, RecordGroup};
use crate::source::{GenerationError, RecordSource};

pub const SEQ: BatchKey = BatchKey::from_static("seq");

/// Emits `[index]` into `seq` and counts how often it was called.
#[derive(Debug, Default)]
pub struct SequenceSource {
    pub calls: AtomicU64,
}

impl RecordSource for SequenceSource {
    fn generate(&self, index: u64) -> Result<RecordGroup, GenerationError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(vec![(SEQ, Record::from_iter([index.to_string()]))])
    }

    fn name(&self) -> &str {
        "sequence"
    }
}

/// Fails with `Malformed` on one specific index.
#[derive(Debug)]
pub struct FailingSource {
    pub fail_at: u64,
}

impl RecordSource for FailingSource {
    fn generate(&self, index: u64) -> Result<RecordGroup, GenerationError> {
        if index == self.fail_at {
            return Err(GenerationError::Malformed(format!("bad index {index}")));
        }
        Ok(vec![(SEQ, Record::from_iter([index.to_string()]))])
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Panics on one specific index.
#[derive(Debug)]
pub struct PanickingSource {
    pub panic_at: u64,
}

impl RecordSource for PanickingSource {
    fn generate(&self, index: u64) -> Result<RecordGroup, GenerationError> {
        if index == self.panic_at {
            panic!("source panicked at index {index}");
        }
        Ok(vec![(SEQ, Record::from_iter([index.to_string()]))])
    }

    fn name(&self) -> &str {
        "panicking"
    }
}
