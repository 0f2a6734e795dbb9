//! # Record Sources
//!
//! A [`RecordSource`] turns an event index into the record(s) that event
//! produces. Generation does no I/O and is safe to call from any worker
//! thread concurrently.
//!
//! Content is not reproducible across runs: reference-data lookups and
//! field values are drawn from the thread-local RNG, unseeded. Only the
//! number and shape of the records is a function of the index.
//!
//! ## Implementations
//!
//! - [`LogEventSource`]: one log line per event, single destination.
//! - [`StreamingSource`]: a streaming-service activity fan-out: watch
//!   history, rating, queue and genre records per event, each tied to a
//!   customer drawn from a [`CustomerPool`].

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests;

mod logs;
mod streaming;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use thiserror::Error;

use crate::record::RecordGroup;

pub use logs::LogEventSource;
pub use streaming::{Customer, CustomerPool, StreamingSource};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned while generating synthetic records.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A reference table needed for lookups has no rows.
    #[error("reference pool is empty")]
    EmptyReferencePool,

    /// Generated data violated the source's own shape rules.
    #[error("malformed record: {0}")]
    Malformed(String),
}

// ------------------------------------------------------------------------------------------------
// Trait
// ------------------------------------------------------------------------------------------------

/// Produces the records for one logical event.
pub trait RecordSource: Send + Sync {
    /// Generates every record belonging to event `index`.
    ///
    /// The returned group is never empty on success.
    fn generate(&self, index: u64) -> Result<RecordGroup, GenerationError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
