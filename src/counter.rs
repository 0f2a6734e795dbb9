//! Shared run state: the completion counter, the cancellation flag and a
//! wall-clock stopwatch.
//!
//! Both shared types are cheap `Arc` handles. The orchestrator creates one
//! of each per run and hands a clone to every worker; there are no
//! process-wide statics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

// ------------------------------------------------------------------------------------------------
// CompletionCounter
// ------------------------------------------------------------------------------------------------

/// Number of events fully processed by all workers of a run.
#[derive(Debug, Clone, Default)]
pub struct CompletionCounter {
    inner: Arc<AtomicU64>,
}

impl CompletionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `events` and returns the new total.
    pub fn add(&self, events: u64) -> u64 {
        self.inner.fetch_add(events, Ordering::AcqRel) + events
    }

    pub fn get(&self) -> u64 {
        self.inner.load(Ordering::Acquire)
    }
}

// ------------------------------------------------------------------------------------------------
// CancelToken
// ------------------------------------------------------------------------------------------------

/// Cooperative stop flag checked by workers between events.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Returns `true` if this call tripped the flag.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

// ------------------------------------------------------------------------------------------------
// Stopwatch
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Events per second over `elapsed`; zero when nothing was measured.
pub fn rate(events: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }
    events as f64 / secs
}

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------
