//! Rule discovery.
//!
//! A [`RuleSource`] enumerates its units every time it is asked, so rules
//! added or removed between two runs are picked up without a restart.
//! Loading a unit is a separate step: discovery never looks inside a unit.

use std::path::PathBuf;
use std::sync::Arc;

use pppat_model::CheckResult;
use pppat_sandbox::SandboxError;

use crate::rule::{FnRule, RuleContext, RuleError, RuleUnit};

/// A discovered, not yet loaded, rule unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitHandle {
    /// Unit identifier, e.g. the file stem `WOI_3p7`.
    pub id: String,
    /// Where the unit is loaded from (a path, or `builtin`).
    pub location: String,
}

/// The rule source itself is unusable. Fatal to a check run.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Rule directory {path} is not readable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rule directory {path} is not a directory")]
    NotADirectory { path: PathBuf },
}

/// A single unit could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum UnitLoadError {
    #[error("Cannot read rule unit {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rule unit {path} is not valid WebAssembly: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Rule unit '{id}' rejected by the sandbox: {source}")]
    Sandbox {
        id: String,
        #[source]
        source: SandboxError,
    },

    #[error("Unknown rule unit '{0}'")]
    Unknown(String),
}

/// Somewhere rule units come from.
pub trait RuleSource: Send + Sync {
    /// Short human-readable description for logs.
    fn describe(&self) -> String;

    /// Enumerate the units present right now.
    fn discover(&self) -> Result<Vec<UnitHandle>, DiscoveryError>;

    /// Load one discovered unit.
    fn load(&self, handle: &UnitHandle) -> Result<RuleUnit, UnitLoadError>;
}

const BUILTIN_LOCATION: &str = "builtin";

/// Rule units compiled into the binary and registered at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    units: Vec<RuleUnit>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the rules shipped with this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for unit in crate::builtin::units() {
            registry.register(unit);
        }
        registry
    }

    /// Register a unit. A unit with an already registered id replaces it.
    pub fn register(&mut self, unit: RuleUnit) {
        match self.units.iter_mut().find(|u| u.id() == unit.id()) {
            Some(existing) => *existing = unit,
            None => self.units.push(unit),
        }
    }

    /// Register a single closure as a one-function unit named `unit_id`,
    /// or append it to that unit if it exists.
    pub fn register_fn<F>(&mut self, unit_id: &str, name: &str, func: F)
    where
        F: Fn(&RuleContext) -> Result<CheckResult, RuleError> + Send + Sync + 'static,
    {
        let rule: Arc<dyn crate::rule::RuleFunction> = Arc::new(FnRule::new(name, func));
        match self.units.iter_mut().find(|u| u.id() == unit_id) {
            Some(existing) => *existing = existing.clone().with_shared(rule),
            None => self.units.push(RuleUnit::new(unit_id).with_shared(rule)),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl RuleSource for StaticRegistry {
    fn describe(&self) -> String {
        format!("static registry ({} units)", self.units.len())
    }

    fn discover(&self) -> Result<Vec<UnitHandle>, DiscoveryError> {
        Ok(self
            .units
            .iter()
            .map(|unit| UnitHandle {
                id: unit.id().to_string(),
                location: BUILTIN_LOCATION.to_string(),
            })
            .collect())
    }

    fn load(&self, handle: &UnitHandle) -> Result<RuleUnit, UnitLoadError> {
        self.units
            .iter()
            .find(|unit| unit.id() == handle.id)
            .cloned()
            .ok_or_else(|| UnitLoadError::Unknown(handle.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_rule(name: &'static str) -> impl Fn(&RuleContext) -> Result<CheckResult, RuleError> {
        move |_| Ok(CheckResult::ok(name, "OK"))
    }

    #[test]
    fn test_empty_registry_discovers_nothing() {
        let registry = StaticRegistry::new();
        assert!(registry.discover().unwrap().is_empty());
    }

    #[test]
    fn test_register_fn_groups_by_unit() {
        let mut registry = StaticRegistry::new();
        registry.register_fn("limits", "check_a", ok_rule("check_a"));
        registry.register_fn("limits", "check_b", ok_rule("check_b"));
        registry.register_fn("other", "check_c", ok_rule("check_c"));

        let handles = registry.discover().unwrap();
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[0].id, "limits");
        assert_eq!(handles[0].location, "builtin");

        let unit = registry.load(&handles[0]).unwrap();
        assert_eq!(unit.functions().len(), 2);
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = StaticRegistry::new();
        registry.register(RuleUnit::new("u").with_function(FnRule::new("check_a", ok_rule("a"))));
        registry.register(RuleUnit::new("u"));
        assert_eq!(registry.len(), 1);
        let unit = registry.load(&registry.discover().unwrap()[0]).unwrap();
        assert!(unit.functions().is_empty());
    }

    #[test]
    fn test_load_unknown_unit() {
        let registry = StaticRegistry::new();
        let handle = UnitHandle {
            id: "ghost".into(),
            location: "builtin".into(),
        };
        assert!(matches!(
            registry.load(&handle),
            Err(UnitLoadError::Unknown(id)) if id == "ghost"
        ));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = StaticRegistry::with_builtins();
        let ids: Vec<String> = registry
            .discover()
            .unwrap()
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert!(ids.contains(&"WOI_3p7".to_string()));
    }
}
