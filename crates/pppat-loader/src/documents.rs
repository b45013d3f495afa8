use std::path::{Path, PathBuf};

use pppat_model::{DcsSettings, WaveformStore};
use serde::{Deserialize, Serialize};

/// Locations of the two configuration documents of a pulse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFiles {
    /// Supervisory document (Sup.xml).
    pub sup: PathBuf,
    /// Waveform program document (DP.xml).
    pub dp: PathBuf,
}

impl SettingsFiles {
    pub fn new(sup: impl Into<PathBuf>, dp: impl Into<PathBuf>) -> Self {
        Self {
            sup: sup.into(),
            dp: dp.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed document {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Scenario '{scenario}' not found in {path}")]
    UnknownScenario { scenario: String, path: PathBuf },
}

/// Parser for the DCS documents.
///
/// The XML formats belong to the DCS tooling; this crate only consumes
/// what they describe.
pub trait DocumentReader: Send + Sync {
    /// Parse the supervisory document: nominal scenario and loaded flag.
    fn read_supervisory(&self, path: &Path) -> Result<DcsSettings, DocumentError>;

    /// Build every waveform the scenario selects from the program document.
    fn read_waveforms(&self, scenario: &str, path: &Path) -> Result<WaveformStore, DocumentError>;
}
