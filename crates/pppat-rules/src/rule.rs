use std::fmt;
use std::sync::Arc;

use pppat_model::{CheckResult, WaveformStore};
use pppat_sandbox::SandboxError;

/// A symbol is a rule function iff its name contains this marker.
pub const RULE_MARKER: &str = "check_";

pub fn is_rule_name(name: &str) -> bool {
    name.contains(RULE_MARKER)
}

/// Everything a rule function is given: the online flag and read-only
/// access to the pulse's waveforms.
#[derive(Debug, Clone)]
pub struct RuleContext {
    is_online: bool,
    waveforms: Arc<WaveformStore>,
}

impl RuleContext {
    pub fn new(is_online: bool, waveforms: Arc<WaveformStore>) -> Self {
        Self {
            is_online,
            waveforms,
        }
    }

    /// True when the IRFM database is reachable from this run.
    pub fn is_online(&self) -> bool {
        self.is_online
    }

    pub fn waveforms(&self) -> &WaveformStore {
        &self.waveforms
    }

    pub fn shared_waveforms(&self) -> Arc<WaveformStore> {
        Arc::clone(&self.waveforms)
    }
}

/// Why a rule function failed to produce a result.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("{0}")]
    Failed(String),

    #[error("waveform {0} not found!?")]
    MissingWaveform(String),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("Rule returned unknown result code {0}")]
    UnknownCode(i32),
}

/// A single check over the pulse settings.
///
/// Implementations must be pure functions of the context: the executor may
/// call them from any thread, in any order relative to other rules.
pub trait RuleFunction: Send + Sync {
    fn name(&self) -> &str;

    fn call(&self, ctx: &RuleContext) -> Result<CheckResult, RuleError>;
}

type RuleFn = dyn Fn(&RuleContext) -> Result<CheckResult, RuleError> + Send + Sync;

/// A rule function backed by a Rust closure or fn item.
pub struct FnRule {
    name: String,
    func: Box<RuleFn>,
}

impl FnRule {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&RuleContext) -> Result<CheckResult, RuleError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl RuleFunction for FnRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, ctx: &RuleContext) -> Result<CheckResult, RuleError> {
        (self.func)(ctx)
    }
}

impl fmt::Debug for FnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule").field("name", &self.name).finish()
    }
}

/// A loaded rule unit: an identifier and every function it exposes, in the
/// unit's own enumeration order. Selecting rule functions by name is the
/// executor's job.
#[derive(Clone)]
pub struct RuleUnit {
    id: String,
    functions: Vec<Arc<dyn RuleFunction>>,
}

impl RuleUnit {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            functions: Vec::new(),
        }
    }

    pub fn with_function(mut self, function: impl RuleFunction + 'static) -> Self {
        self.functions.push(Arc::new(function));
        self
    }

    pub fn with_shared(mut self, function: Arc<dyn RuleFunction>) -> Self {
        self.functions.push(function);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn functions(&self) -> &[Arc<dyn RuleFunction>] {
        &self.functions
    }
}

impl fmt::Debug for RuleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.functions.iter().map(|func| func.name()).collect();
        f.debug_struct("RuleUnit")
            .field("id", &self.id)
            .field("functions", &names)
            .finish()
    }
}
