use std::sync::Arc;
use std::time::Duration;

use pppat_loader::{DocumentReader, LoadError, PulseArchive, SettingsFiles, SettingsLoader};
use pppat_model::SettingsModel;
use pppat_rules::{RuleDirectory, StaticRegistry};
use pppat_sandbox::{Sandbox, SandboxError};
use tracing::{error, info, warn};

use crate::checker::{CheckError, Checker};
use crate::config::{CheckerConfig, ConfigError, ExecutionConfig, ExecutionMode};
use crate::executor::{Executor, ParallelExecutor, SequentialExecutor};
use crate::observer::TracingObserver;
use crate::report::CheckReport;

/// A checker could not be built from its configuration.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot create rule sandbox: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Cannot create executor thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Model of the settings of one pulse, and the checks run against them.
///
/// Every load replaces the model wholesale. A failed load leaves the model
/// unloaded rather than keeping the previous pulse around.
pub struct PulseSettings {
    loader: SettingsLoader,
    checker: Checker,
    model: SettingsModel,
}

impl PulseSettings {
    pub fn new(loader: SettingsLoader, checker: Checker) -> Self {
        info!("init Pulse Setting");
        Self {
            loader,
            checker,
            model: SettingsModel::unloaded(),
        }
    }

    /// Build the loader, the rule sources and the executor from `config`.
    pub fn from_config(
        config: &CheckerConfig,
        reader: Box<dyn DocumentReader>,
        archive: Box<dyn PulseArchive>,
    ) -> Result<Self, SetupError> {
        config.validate()?;

        let mut checker = Checker::new(build_executor(&config.execution)?, Arc::new(TracingObserver));
        if config.include_builtin_rules {
            checker.add_source(Box::new(StaticRegistry::with_builtins()));
        }
        if let Some(dir) = &config.rule_dir {
            let sandbox = Arc::new(Sandbox::new(&config.sandbox)?);
            checker.add_source(Box::new(RuleDirectory::new(dir, sandbox)));
        }

        let loader = SettingsLoader::new(reader, archive).with_layout(config.archive.clone());
        Ok(Self::new(loader, checker))
    }

    /// Load the settings from a pair of documents on disk.
    ///
    /// Returns the DCS loaded flag, false on any error.
    pub fn load_from_file(&mut self, files: &SettingsFiles) -> bool {
        let outcome = self.loader.load_files(files);
        self.apply(outcome)
    }

    /// Load the settings archived for `pulse`.
    pub fn load_from_pulse(&mut self, pulse: u64) -> bool {
        let outcome = self.loader.load_pulse(pulse);
        self.apply(outcome)
    }

    /// Load the live settings from the session leader. Not available yet:
    /// always false.
    pub fn load_from_session_leader(&mut self) -> bool {
        let outcome = self.loader.load_session_leader();
        self.apply(outcome)
    }

    /// Run every discovered rule against the current settings.
    ///
    /// `is_online` tells rules whether the IRFM database is reachable.
    pub fn check_all(&self, is_online: bool) -> Result<CheckReport, CheckError> {
        if !self.model.is_loaded() {
            warn!("Checking pulse settings that are not loaded");
        }
        self.checker
            .check_all(self.model.shared_waveforms(), is_online)
    }

    pub fn model(&self) -> &SettingsModel {
        &self.model
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_loaded()
    }

    pub fn checker(&self) -> &Checker {
        &self.checker
    }

    fn apply(&mut self, outcome: Result<SettingsModel, LoadError>) -> bool {
        match outcome {
            Ok(model) => {
                self.model = model;
                self.model.is_loaded()
            }
            Err(err) => {
                error!(error = %err, "Cannot load pulse settings");
                self.model = SettingsModel::unloaded();
                false
            }
        }
    }
}

impl std::fmt::Debug for PulseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulseSettings")
            .field("checker", &self.checker)
            .field("model", &self.model)
            .finish()
    }
}

fn build_executor(config: &ExecutionConfig) -> Result<Box<dyn Executor>, SetupError> {
    let timeout: Option<Duration> = config.rule_timeout();
    Ok(match config.mode {
        ExecutionMode::Sequential => {
            let executor = SequentialExecutor::new();
            Box::new(match timeout {
                Some(limit) => executor.with_timeout(limit),
                None => executor,
            })
        }
        ExecutionMode::Parallel => {
            let executor = ParallelExecutor::new(config.max_threads)?;
            Box::new(match timeout {
                Some(limit) => executor.with_timeout(limit),
                None => executor,
            })
        }
    })
}
