//! Telemetry utilities: scan timing and span constructors.

use std::time::Instant;

/// Guard for timing a tracker scan.
///
/// Records the scan with the given result label when dropped; callers
/// update the label with [`ScanTimer::finish`].
pub struct ScanTimer {
    result: &'static str,
    start: Instant,
}

impl ScanTimer {
    pub fn new() -> Self {
        Self {
            result: "aborted",
            start: Instant::now(),
        }
    }

    pub fn finish(&mut self, result: &'static str) {
        self.result = result;
    }
}

impl Default for ScanTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScanTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_scan(self.result, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for everything one account's session does.
    pub fn account(id: u64, label: &str) -> Span {
        info_span!("account", id = id, label = %label)
    }

    /// Span for one tracker scan.
    pub fn scan(scope: &str, role: &str) -> Span {
        info_span!("scan", scope = %scope, role = %role)
    }
}
