//! # Range Partitioning
//!
//! Splits a run of `total_events` logical events into one contiguous,
//! inclusive [`EventRange`] per worker.
//!
//! Every worker receives `floor(total_events / worker_count)` indices; the
//! last worker's range is stretched to `total_events - 1` so it absorbs the
//! remainder. Early workers are therefore never larger than the last one.
//!
//! ```text
//! total_events = 100, worker_count = 3, size = 33
//!
//! worker 0: [ 0, 32]
//! worker 1: [33, 65]
//! worker 2: [66, 99]   <- 34 indices
//! ```

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------


// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::fmt;

use crate::BenchError;

// ------------------------------------------------------------------------------------------------
// EventRange
// ------------------------------------------------------------------------------------------------

/// An inclusive range of event indices owned by a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventRange {
    /// First index, inclusive.
    pub start: u64,

    /// Last index, inclusive. Always `>= start`.
    pub end: u64,
}

impl EventRange {
    /// Number of indices covered by this range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always `false`: an inclusive range holds at least one index.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if `index` is the final index of this range.
    pub fn is_last(&self, index: u64) -> bool {
        index == self.end
    }

    /// Iterates the indices in increasing order.
    pub fn indices(&self) -> std::ops::RangeInclusive<u64> {
        self.start..=self.end
    }
}

impl fmt::Display for EventRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

// ------------------------------------------------------------------------------------------------
// Partitioning
// ------------------------------------------------------------------------------------------------

/// Splits `[0, total_events)` into `worker_count` contiguous ranges.
///
/// # Errors
///
/// Returns [`BenchError::InvalidPartition`] if either argument is zero or
/// if `floor(total_events / worker_count) == 0`, i.e. there are more
/// workers than events.
pub fn partition(total_events: u64, worker_count: usize) -> Result<Vec<EventRange>, BenchError> {
    let workers = worker_count as u64;
    let invalid = || BenchError::InvalidPartition {
        total_events,
        worker_count,
    };

    if total_events == 0 || workers == 0 {
        return Err(invalid());
    }

    let size = total_events / workers;
    if size == 0 {
        return Err(invalid());
    }

    let ranges = (0..workers)
        .map(|i| {
            let start = i * size;
            let end = if i == workers - 1 {
                total_events - 1
            } else {
                start + size - 1
            };
            EventRange { start, end }
        })
        .collect();

    Ok(ranges)
}
