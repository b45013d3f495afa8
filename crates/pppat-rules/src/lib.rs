//! Rule functions and the registries that discover them.
//!
//! A rule function checks one property of a pulse's settings and reports a
//! [`CheckResult`](pppat_model::CheckResult). Rules are grouped in units;
//! units come from a [`RuleSource`](registry::RuleSource), either compiled in
//! ([`StaticRegistry`](registry::StaticRegistry)) or scanned from a directory
//! at every run ([`RuleDirectory`](directory::RuleDirectory)).

pub mod builtin;
pub mod directory;
pub mod registry;
pub mod rule;
pub mod wasm;

pub use directory::RuleDirectory;
pub use registry::{DiscoveryError, RuleSource, StaticRegistry, UnitHandle, UnitLoadError};
pub use rule::{is_rule_name, FnRule, RuleContext, RuleError, RuleFunction, RuleUnit, RULE_MARKER};
