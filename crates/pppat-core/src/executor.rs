//! Execution strategies for a check plan.
//!
//! Both executors return results in plan order, so a report does not depend
//! on which strategy produced it.

use std::sync::Arc;
use std::time::Duration;

use pppat_model::CheckResult;
use pppat_rules::RuleContext;
use rayon::prelude::*;

use crate::boundary::{invoke_guarded, invoke_with_timeout};
use crate::checker::PlannedCheck;
use crate::observer::CheckObserver;

pub trait Executor: Send + Sync {
    /// Run every planned check and return one result per entry, in order.
    fn execute(
        &self,
        plan: &[PlannedCheck],
        ctx: &RuleContext,
        observer: &dyn CheckObserver,
    ) -> Vec<CheckResult>;
}

fn run_one(
    check: &PlannedCheck,
    ctx: &RuleContext,
    timeout: Option<Duration>,
    observer: &dyn CheckObserver,
) -> CheckResult {
    match check {
        PlannedCheck::Rule(rule) => match timeout {
            Some(limit) => invoke_with_timeout(Arc::clone(rule), ctx, limit, observer),
            None => invoke_guarded(rule.as_ref(), ctx, observer),
        },
        PlannedCheck::UnitFailure { unit, message } => CheckResult::error(unit, message),
    }
}

/// Runs checks one after another on the calling thread.
#[derive(Debug, Clone, Default)]
pub struct SequentialExecutor {
    timeout: Option<Duration>,
}

impl SequentialExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abandon any single rule that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Executor for SequentialExecutor {
    fn execute(
        &self,
        plan: &[PlannedCheck],
        ctx: &RuleContext,
        observer: &dyn CheckObserver,
    ) -> Vec<CheckResult> {
        plan.iter()
            .map(|check| run_one(check, ctx, self.timeout, observer))
            .collect()
    }
}

/// Runs checks on a dedicated rayon pool.
pub struct ParallelExecutor {
    pool: rayon::ThreadPool,
    timeout: Option<Duration>,
}

impl ParallelExecutor {
    /// A pool of `threads` workers; 0 lets rayon pick.
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("pppat-check-{i}"))
            .build()?;
        Ok(Self {
            pool,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Executor for ParallelExecutor {
    fn execute(
        &self,
        plan: &[PlannedCheck],
        ctx: &RuleContext,
        observer: &dyn CheckObserver,
    ) -> Vec<CheckResult> {
        let timeout = self.timeout;
        self.pool.install(|| {
            plan.par_iter()
                .map(|check| run_one(check, ctx, timeout, observer))
                .collect()
        })
    }
}

impl std::fmt::Debug for ParallelExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("threads", &self.threads())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use pppat_model::{ResultCode, WaveformStore};
    use pppat_rules::{FnRule, RuleFunction};

    use crate::observer::NullObserver;

    fn plan(n: usize) -> Vec<PlannedCheck> {
        (0..n)
            .map(|i| {
                let name = format!("check_{i:02}");
                let rule: Arc<dyn RuleFunction> = Arc::new(FnRule::new(name.clone(), move |_| {
                    // Later rules finish first.
                    thread::sleep(Duration::from_millis(((n - i) * 2) as u64));
                    Ok(CheckResult::ok(name.clone(), "OK"))
                }));
                PlannedCheck::from(rule)
            })
            .collect()
    }

    fn ctx() -> RuleContext {
        RuleContext::new(true, Arc::new(WaveformStore::new()))
    }

    fn names(results: &[CheckResult]) -> Vec<String> {
        results.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn test_parallel_preserves_plan_order() {
        let plan = plan(16);
        let sequential = SequentialExecutor::new().execute(&plan, &ctx(), &NullObserver);
        let parallel = ParallelExecutor::new(4)
            .unwrap()
            .execute(&plan, &ctx(), &NullObserver);
        assert_eq!(names(&sequential), names(&parallel));
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_unit_failure_entries_in_place() {
        let mut plan = plan(2);
        plan.insert(
            1,
            PlannedCheck::UnitFailure {
                unit: "broken".into(),
                message: "cannot load".into(),
            },
        );
        let results = ParallelExecutor::new(2)
            .unwrap()
            .execute(&plan, &ctx(), &NullObserver);
        assert_eq!(names(&results), vec!["check_00", "broken", "check_01"]);
        assert_eq!(results[1].code, ResultCode::Error);
        assert_eq!(results[1].text, "cannot load");
    }

    #[test]
    fn test_empty_plan() {
        let results = SequentialExecutor::new().execute(&[], &ctx(), &NullObserver);
        assert!(results.is_empty());
    }
}
