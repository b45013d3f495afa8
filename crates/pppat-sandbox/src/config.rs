//! Sandbox configuration: memory cap, fuel metering, module size limit.
use serde::{Deserialize, Serialize};

/// Configuration for the WASM sandbox rule units run in.
///
/// Rule units get no filesystem, no network and no clock; their only
/// import is the read-only `pulse` host module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Maximum linear memory per instance in bytes (default: 64 MB).
    pub memory_limit_bytes: u64,
    /// Fuel budget per rule function call. None = unlimited.
    pub fuel_per_call: Option<u64>,
    /// Largest rule unit accepted from disk, in bytes.
    pub max_module_bytes: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: 64 * 1024 * 1024, // 64 MB
            fuel_per_call: Some(10_000_000),
            max_module_bytes: 16 * 1024 * 1024, // 16 MB
        }
    }
}
