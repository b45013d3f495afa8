//! Rule discovery, planning and the check loop.

use std::fmt;
use std::sync::Arc;

use pppat_model::WaveformStore;
use pppat_rules::{is_rule_name, DiscoveryError, RuleContext, RuleFunction, RuleSource, UnitHandle};

use crate::executor::{Executor, SequentialExecutor};
use crate::observer::{CheckObserver, TracingObserver};
use crate::report::CheckReport;

/// A check run could not start.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("Rule discovery failed for {source_name}: {source}")]
    Discovery {
        source_name: String,
        #[source]
        source: DiscoveryError,
    },
}

/// One entry of an execution plan.
#[derive(Clone)]
pub enum PlannedCheck {
    /// A rule function to call.
    Rule(Arc<dyn RuleFunction>),
    /// A unit that failed to load; reported as a single ERROR result.
    UnitFailure { unit: String, message: String },
}

impl PlannedCheck {
    /// Name of the result this entry will produce, unless the rule
    /// overrides it.
    pub fn name(&self) -> &str {
        match self {
            PlannedCheck::Rule(rule) => rule.name(),
            PlannedCheck::UnitFailure { unit, .. } => unit,
        }
    }
}

impl From<Arc<dyn RuleFunction>> for PlannedCheck {
    fn from(rule: Arc<dyn RuleFunction>) -> Self {
        PlannedCheck::Rule(rule)
    }
}

impl fmt::Debug for PlannedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannedCheck::Rule(rule) => f.debug_tuple("Rule").field(&rule.name()).finish(),
            PlannedCheck::UnitFailure { unit, message } => f
                .debug_struct("UnitFailure")
                .field("unit", unit)
                .field("message", message)
                .finish(),
        }
    }
}

/// Discovers rule units and runs their rule functions.
///
/// Sources are rediscovered on every run. Units are ordered by id across
/// all sources, then by source registration order, then by location.
/// Functions are ordered by name within a unit. Two runs over the same rules
/// give the same report.
pub struct Checker {
    sources: Vec<Box<dyn RuleSource>>,
    executor: Box<dyn Executor>,
    observer: Arc<dyn CheckObserver>,
}

impl Checker {
    pub fn new(executor: Box<dyn Executor>, observer: Arc<dyn CheckObserver>) -> Self {
        Self {
            sources: Vec::new(),
            executor,
            observer,
        }
    }

    /// A checker that runs rules sequentially and logs through `tracing`.
    pub fn sequential() -> Self {
        Self::new(Box::new(SequentialExecutor::new()), Arc::new(TracingObserver))
    }

    pub fn with_source(mut self, source: impl RuleSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn add_source(&mut self, source: Box<dyn RuleSource>) {
        self.sources.push(source);
    }

    pub fn sources(&self) -> impl Iterator<Item = &dyn RuleSource> {
        self.sources.iter().map(|s| s.as_ref())
    }

    /// Discover and load every unit, and build the execution plan.
    pub fn plan(&self) -> Result<Vec<PlannedCheck>, CheckError> {
        let mut handles: Vec<(usize, UnitHandle)> = Vec::new();
        for (index, source) in self.sources.iter().enumerate() {
            let found = source.discover().map_err(|source_err| CheckError::Discovery {
                source_name: source.describe(),
                source: source_err,
            })?;
            handles.extend(found.into_iter().map(|handle| (index, handle)));
        }
        handles.sort_by(|(ia, a), (ib, b)| {
            a.id.cmp(&b.id)
                .then(ia.cmp(ib))
                .then_with(|| a.location.cmp(&b.location))
        });

        let mut plan = Vec::new();
        for (index, handle) in handles {
            match self.sources[index].load(&handle) {
                Ok(unit) => {
                    let mut functions: Vec<Arc<dyn RuleFunction>> = unit
                        .functions()
                        .iter()
                        .filter(|f| is_rule_name(f.name()))
                        .cloned()
                        .collect();
                    functions.sort_by(|a, b| a.name().cmp(b.name()));
                    self.observer
                        .unit_scanned(&handle.id, &handle.location, functions.len());
                    plan.extend(functions.into_iter().map(PlannedCheck::Rule));
                }
                Err(err) => {
                    let message = err.to_string();
                    self.observer.unit_failed(&handle.id, &message);
                    plan.push(PlannedCheck::UnitFailure {
                        unit: handle.id,
                        message,
                    });
                }
            }
        }
        Ok(plan)
    }

    /// Run every rule function against `waveforms`.
    ///
    /// Rule failures never abort the run; only a source that cannot be
    /// enumerated does.
    pub fn check_all(
        &self,
        waveforms: Arc<WaveformStore>,
        is_online: bool,
    ) -> Result<CheckReport, CheckError> {
        self.observer.run_started(is_online);
        let plan = self.plan()?;
        let ctx = RuleContext::new(is_online, waveforms);
        let report: CheckReport = self
            .executor
            .execute(&plan, &ctx, self.observer.as_ref())
            .into_iter()
            .collect();
        self.observer.run_finished(&report);
        Ok(report)
    }
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<String> = self.sources.iter().map(|s| s.describe()).collect();
        f.debug_struct("Checker").field("sources", &sources).finish()
    }
}
