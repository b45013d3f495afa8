//! Checker configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pppat_loader::ArchiveLayout;
use pppat_sandbox::SandboxConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

/// How rule functions are scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    /// Worker threads in parallel mode; 0 lets rayon pick.
    pub max_threads: usize,
    /// Per-function wall-clock limit. None disables it.
    pub rule_timeout_ms: Option<u64>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            max_threads: 4,
            rule_timeout_ms: Some(30_000), // 30 s
        }
    }
}

impl ExecutionConfig {
    pub fn rule_timeout(&self) -> Option<Duration> {
        self.rule_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Directory scanned for rule units at every run. None disables it.
    pub rule_dir: Option<PathBuf>,
    /// Also run the rules compiled into the binary.
    pub include_builtin_rules: bool,
    pub execution: ExecutionConfig,
    pub sandbox: SandboxConfig,
    pub archive: ArchiveLayout,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            rule_dir: Some(PathBuf::from("rules/pre_pulse")),
            include_builtin_rules: false,
            execution: ExecutionConfig::default(),
            sandbox: SandboxConfig::default(),
            archive: ArchiveLayout::default(),
        }
    }
}

impl CheckerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.execution.rule_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "execution.rule_timeout_ms must be positive".into(),
            ));
        }
        if self.rule_dir.is_none() && !self.include_builtin_rules {
            return Err(ConfigError::Invalid("no rule source configured".into()));
        }
        Ok(())
    }
}
