//! Scoped ownership of a sink handle.

use tracing::warn;

use super::{DataSink, SinkError, SinkFactory};

/// Owns one [`DataSink`] handle and closes it exactly once.
///
/// [`ScopedSink::close`] closes explicitly and reports the error. If the
/// guard is dropped first (an early `?` return, a panic) the handle is
/// closed in `Drop` and any error is logged.
pub struct ScopedSink {
    sink: Box<dyn DataSink>,
    closed: bool,
    owner: usize,
}

impl ScopedSink {
    /// Opens a handle from `factory` on behalf of worker `owner`.
    pub fn open(factory: &dyn SinkFactory, owner: usize) -> Result<Self, SinkError> {
        Ok(Self {
            sink: factory.open()?,
            closed: false,
            owner,
        })
    }

    pub fn as_mut(&mut self) -> &mut dyn DataSink {
        self.sink.as_mut()
    }

    pub fn close(mut self) -> Result<(), SinkError> {
        self.closed = true;
        self.sink.close()
    }
}

impl Drop for ScopedSink {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.sink.close() {
            warn!(worker = self.owner, "closing sink handle failed: {e}");
        }
    }
}
