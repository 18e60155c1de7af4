//! Drop-based timing of archive and revert runs.
//!
//! ```rust,ignore
//! let _timing = TimingGuard::archive("Invoice");
//! // logged with its duration when `_timing` goes out of scope
//! ```

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs faster than this are logged at debug level only.
const QUIET_BELOW: Duration = Duration::from_millis(250);

/// Runs longer than this are reported as slow.
const SLOW_AFTER: Duration = Duration::from_secs(30);

/// Logs how long a report operation took once it is dropped.
pub struct TimingGuard {
    operation: &'static str,
    report: String,
    started: Instant,
}

impl TimingGuard {
    pub fn new(operation: &'static str, report: impl Into<String>) -> Self {
        let report = report.into();
        debug!(operation, report = %report, "Started");
        Self {
            operation,
            report,
            started: Instant::now(),
        }
    }

    pub fn archive(report: impl Into<String>) -> Self {
        Self::new("archive", report)
    }

    pub fn revert(report: impl Into<String>) -> Self {
        Self::new("revert", report)
    }
}

fn human(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let took = human(elapsed);
        let (operation, report) = (self.operation, self.report.as_str());

        if elapsed >= SLOW_AFTER {
            warn!(operation, report, took = %took, "Slow {} run", operation);
        } else if elapsed >= QUIET_BELOW {
            info!(operation, report, took = %took, "Finished");
        } else {
            debug!(operation, report, took = %took, "Finished");
        }
    }
}
