//! Run observation.
//!
//! The checker reports its progress to an injected [`CheckObserver`]
//! instead of logging directly.

use pppat_model::CheckResult;
use tracing::{debug, error, info, warn};

use crate::report::CheckReport;

/// Receives progress events from a check run. Every method defaults to a
/// no-op. Called from executor threads, hence `Send + Sync`.
pub trait CheckObserver: Send + Sync {
    fn run_started(&self, _is_online: bool) {}

    /// A unit was loaded; `functions` rule functions were selected from it.
    fn unit_scanned(&self, _unit: &str, _location: &str, _functions: usize) {}

    fn unit_failed(&self, _unit: &str, _error: &str) {}

    fn function_started(&self, _name: &str) {}

    /// The function raised, panicked or timed out.
    fn function_failed(&self, _name: &str, _error: &str) {}

    /// Called for every function, including failed ones.
    fn function_finished(&self, _result: &CheckResult) {}

    fn run_finished(&self, _report: &CheckReport) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl CheckObserver for NullObserver {}

/// Emits every event as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CheckObserver for TracingObserver {
    fn run_started(&self, is_online: bool) {
        info!(is_online, "Starting pulse settings checks");
    }

    fn unit_scanned(&self, unit: &str, location: &str, functions: usize) {
        debug!(unit, location, functions, "Scanned rule unit");
    }

    fn unit_failed(&self, unit: &str, error: &str) {
        error!(unit, error, "Rule unit failed to load");
    }

    fn function_started(&self, name: &str) {
        debug!(function = name, "Testing...");
    }

    fn function_failed(&self, name: &str, error: &str) {
        error!(function = name, error, "Rule function failed");
    }

    fn function_finished(&self, result: &CheckResult) {
        info!(
            function = %result.name,
            result = result.code_name(),
            "Rule function finished"
        );
    }

    fn run_finished(&self, report: &CheckReport) {
        match report.worst_code() {
            Some(worst) if !report.is_ok() => warn!(
                checks = report.len(),
                worst = worst.code_name(),
                "Pulse settings checks finished with findings"
            ),
            _ => info!(checks = report.len(), "Pulse settings checks finished"),
        }
    }
}
