//! # Data Sinks
//!
//! A [`DataSink`] is one connection to a target data store. It accepts
//! batches of [`Record`]s for a named destination, answers count queries
//! and point reads, and is closed exactly once by its owner.
//!
//! Sinks are never shared between threads. A [`SinkFactory`] is the
//! shareable half: every worker calls [`SinkFactory::open`] to obtain its
//! own handle.
//!
//! ## Implementations
//!
//! - [`MemoryStore`] / [`MemorySink`]: in-process document store.
//! - [`FileStore`] / [`FileSink`]: append-only tab-separated column files.
//! - [`NullStore`] / [`NullSink`]: discards everything.
//!
//! [`ScopedSink`] wraps a handle so it is closed on every exit path.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests;

mod file;
mod memory;
mod null;
mod scoped;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::fmt;
use std::io;

use thiserror::Error;

use crate::record::{BatchKey, Record};

pub use file::{FileSink, FileStore};
pub use memory::{MemorySink, MemoryStore, MemoryStoreStats};
pub use null::{NullSink, NullStore};
pub use scoped::ScopedSink;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The store could not be reached or refused the connection.
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// A batch write was rejected or failed part-way.
    #[error("write to '{destination}' failed: {reason}")]
    Write { destination: String, reason: String },

    /// The handle was used after [`DataSink::close`].
    #[error("sink handle is closed")]
    Closed,

    /// Underlying I/O error outside of a batch write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

// ------------------------------------------------------------------------------------------------
// Write mode
// ------------------------------------------------------------------------------------------------

/// Whether a batch must be durable before `write_batch` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Wait for the store to acknowledge the batch.
    #[default]
    Sync,

    /// Hand the batch to the store without waiting for durability.
    Async,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => f.write_str("sync"),
            Self::Async => f.write_str("async"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Predicate
// ------------------------------------------------------------------------------------------------

/// Selects records for [`DataSink::read_one`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches any record.
    Any,

    /// Matches records whose field `field` equals `value`.
    FieldEquals { field: usize, value: String },
}

impl Predicate {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Any => true,
            Self::FieldEquals { field, value } => record.field(*field) == Some(value.as_str()),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Traits
// ------------------------------------------------------------------------------------------------

/// A single connection to a data store, owned by exactly one worker.
pub trait DataSink: Send {
    /// Persists `records` into `destination`.
    ///
    /// With [`WriteMode::Sync`] the call returns once the store has
    /// acknowledged the batch; with [`WriteMode::Async`] it may return
    /// earlier.
    fn write_batch(
        &mut self,
        destination: &BatchKey,
        records: Vec<Record>,
        mode: WriteMode,
    ) -> Result<(), SinkError>;

    /// Returns the number of records stored in `destination`.
    fn count(&mut self, destination: &BatchKey) -> Result<u64, SinkError>;

    /// Returns the first record in `destination` matching `predicate`.
    fn read_one(
        &mut self,
        destination: &BatchKey,
        predicate: &Predicate,
    ) -> Result<Option<Record>, SinkError>;

    /// Releases the connection. Calling `close` more than once is harmless.
    fn close(&mut self) -> Result<(), SinkError>;
}

/// Opens independent [`DataSink`] handles onto one store.
pub trait SinkFactory: Send + Sync {
    /// Opens a new handle.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Unavailable`] if the store cannot be reached.
    fn open(&self) -> Result<Box<dyn DataSink>, SinkError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
