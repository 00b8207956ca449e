//! Per-run counters and the final run report.

use std::path::PathBuf;

use serde::Serialize;

/// Mutable tallies for one run invocation.
///
/// Owned by the orchestrator and mutated only on its thread; there is no
/// ambient state, one `RunState` exists per `run` call.
#[derive(Debug, Default, Clone)]
pub struct RunState {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub consecutive_timeouts: u32,
    pub circuit_breaker_tripped: bool,
}

impl RunState {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Self::default()
        }
    }

    /// A timeout-free success resets the consecutive-timeout streak.
    pub fn record_success(&mut self) {
        self.succeeded += 1;
        self.consecutive_timeouts = 0;
    }

    /// A non-timeout failure leaves the streak unchanged: only timeouts
    /// advance it and only successes reset it.
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Records a timeout and returns the new streak length.
    pub fn record_timeout(&mut self) -> u32 {
        self.failed += 1;
        self.timed_out += 1;
        self.consecutive_timeouts += 1;
        self.consecutive_timeouts
    }
}

/// Immutable summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Path of the intermediate result artifact.
    pub artifact: PathBuf,
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub circuit_breaker_tripped: bool,
    /// Success rate over attempted files, in percent.
    pub success_rate: f64,
    /// Detailed failure report, present when reporting is enabled and
    /// something failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
}

impl RunReport {
    /// Whether any file failed or the breaker tripped.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.circuit_breaker_tripped
    }
}
