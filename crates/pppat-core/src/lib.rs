//! Pre-pulse settings checks.
//!
//! [`PulseSettings`](pulse::PulseSettings) loads a pulse's settings and runs
//! every discovered rule against them. Each rule runs behind a failure
//! boundary, so a broken rule costs one ERROR entry in the report and
//! nothing else.

pub mod boundary;
pub mod checker;
pub mod config;
pub mod executor;
pub mod observer;
pub mod pulse;
pub mod report;

pub use checker::{CheckError, Checker, PlannedCheck};
pub use config::{CheckerConfig, ConfigError, ExecutionConfig, ExecutionMode};
pub use executor::{Executor, ParallelExecutor, SequentialExecutor};
pub use observer::{CheckObserver, NullObserver, TracingObserver};
pub use pulse::{PulseSettings, SetupError};
pub use report::CheckReport;
