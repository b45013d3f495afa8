use std::sync::Arc;

use pppat_model::{CheckResult, ResultCode};
use pppat_sandbox::{LoadedModule, Sandbox};

use crate::rule::{RuleContext, RuleError, RuleFunction};

/// A rule function exported by a sandboxed rule unit.
pub struct WasmRule {
    name: String,
    module: Arc<LoadedModule>,
    sandbox: Arc<Sandbox>,
}

impl WasmRule {
    pub fn new(name: impl Into<String>, module: Arc<LoadedModule>, sandbox: Arc<Sandbox>) -> Self {
        Self {
            name: name.into(),
            module,
            sandbox,
        }
    }
}

impl RuleFunction for WasmRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, ctx: &RuleContext) -> Result<CheckResult, RuleError> {
        let outcome = self.sandbox.call_check(
            &self.module,
            &self.name,
            ctx.is_online(),
            ctx.shared_waveforms(),
        )?;

        let code = ResultCode::from_i32(outcome.code).ok_or(RuleError::UnknownCode(outcome.code))?;
        let name = outcome.name.unwrap_or_else(|| self.name.clone());
        let text = outcome
            .text
            .unwrap_or_else(|| code.code_name().to_string());

        Ok(CheckResult::new(name, code, text))
    }
}

impl std::fmt::Debug for WasmRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmRule").field("name", &self.name).finish()
    }
}
