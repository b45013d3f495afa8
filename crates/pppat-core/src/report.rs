use std::collections::BTreeMap;

use pppat_model::{CheckResult, ResultCode};
use serde::{Deserialize, Serialize};

/// Every result of a check run, in execution-plan order.
///
/// Nothing is deduplicated, filtered or reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<CheckResult> {
        self.results
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CheckResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// First result with the given name.
    pub fn find(&self, name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Number of results with the given code.
    pub fn count(&self, code: ResultCode) -> usize {
        self.results.iter().filter(|r| r.code == code).count()
    }

    /// Number of results per code, codes without results omitted.
    pub fn counts(&self) -> BTreeMap<ResultCode, usize> {
        let mut counts = BTreeMap::new();
        for result in &self.results {
            *counts.entry(result.code).or_insert(0) += 1;
        }
        counts
    }

    /// Most severe code in the report, None when empty.
    pub fn worst_code(&self) -> Option<ResultCode> {
        self.results.iter().map(|r| r.code).max()
    }

    /// True when every result is OK. An empty report is OK.
    pub fn is_ok(&self) -> bool {
        self.results.iter().all(|r| r.code == ResultCode::Ok)
    }

    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl FromIterator<CheckResult> for CheckReport {
    fn from_iter<I: IntoIterator<Item = CheckResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CheckReport {
    type Item = CheckResult;
    type IntoIter = std::vec::IntoIter<CheckResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a CheckReport {
    type Item = &'a CheckResult;
    type IntoIter = std::slice::Iter<'a, CheckResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
