use std::time::Instant;

use tracing::trace;

/// Emits a `timing` trace event with the elapsed time of the enclosing scope
/// when dropped. Reconciliation passes hold one for their whole duration.
pub(crate) struct ScopedTimer {
    started: Instant,
    operation: &'static str,
}

impl ScopedTimer {
    pub(crate) fn new(operation: &'static str) -> Self {
        Self {
            started: Instant::now(),
            operation,
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        trace!(
            target: "timing",
            operation = self.operation,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Operation finished"
        );
    }
}
