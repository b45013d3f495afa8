//! The per-function failure boundary.
//!
//! Whatever a rule function does, the caller gets back exactly one
//! [`CheckResult`]. Errors and panics become ERROR results carrying the
//! failure message.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use pppat_model::CheckResult;
use pppat_rules::{RuleContext, RuleFunction};

use crate::observer::CheckObserver;

/// Run `rule` on the current thread.
pub fn invoke_guarded(
    rule: &dyn RuleFunction,
    ctx: &RuleContext,
    observer: &dyn CheckObserver,
) -> CheckResult {
    observer.function_started(rule.name());
    let outcome = guarded_call(rule, ctx);
    finish(rule.name(), outcome, observer)
}

/// Run `rule` on a dedicated thread and give up on it after `timeout`.
///
/// A rule that overruns is reported as an ERROR result. Its thread is
/// detached and left to finish on its own; its result is discarded.
pub fn invoke_with_timeout(
    rule: Arc<dyn RuleFunction>,
    ctx: &RuleContext,
    timeout: Duration,
    observer: &dyn CheckObserver,
) -> CheckResult {
    let name = rule.name().to_string();
    observer.function_started(&name);

    let (tx, rx) = channel::bounded(1);
    let worker_ctx = ctx.clone();
    let spawned = thread::Builder::new()
        .name(format!("rule-{name}"))
        .spawn(move || {
            // The receiver may be gone after a timeout.
            let _ = tx.send(guarded_call(rule.as_ref(), &worker_ctx));
        });

    let outcome = match spawned {
        Ok(_) => match rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(format!(
                "Rule timed out after {} ms",
                timeout.as_millis()
            )),
            Err(RecvTimeoutError::Disconnected) => {
                Err("Rule thread exited without a result".to_string())
            }
        },
        Err(err) => Err(format!("Cannot start rule thread: {err}")),
    };
    finish(&name, outcome, observer)
}

fn guarded_call(rule: &dyn RuleFunction, ctx: &RuleContext) -> Result<CheckResult, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| rule.call(ctx))) {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn finish(
    name: &str,
    outcome: Result<CheckResult, String>,
    observer: &dyn CheckObserver,
) -> CheckResult {
    let result = match outcome {
        Ok(result) => result,
        Err(message) => {
            observer.function_failed(name, &message);
            CheckResult::error(name, message)
        }
    };
    observer.function_finished(&result);
    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("Rule panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("Rule panicked: {s}")
    } else {
        "Rule panicked".to_string()
    }
}
