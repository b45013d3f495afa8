use std::path::PathBuf;

use pppat_model::SettingsModel;
use tracing::{debug, info};

use crate::archive::{ArchiveError, ArchiveLayout, PulseArchive, TgzBundle};
use crate::documents::{DocumentError, DocumentReader, SettingsFiles};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Problem with the database to get pulse setting files (pulse {pulse}, status {status})")]
    Retrieval { pulse: u64, status: i32 },

    #[error("Problem to read the xml files: {path} is not a valid archive")]
    InvalidArchive { path: PathBuf },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Cannot create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("Loading settings from the session leader is not implemented")]
    NotImplemented,
}

/// Builds settings models from configuration documents.
///
/// Both entry points end in [`load_files`](Self::load_files), so a model
/// looks the same whether it came from disk or from the archive.
pub struct SettingsLoader {
    reader: Box<dyn DocumentReader>,
    archive: Box<dyn PulseArchive>,
    layout: ArchiveLayout,
    scratch_root: Option<PathBuf>,
}

impl SettingsLoader {
    pub fn new(reader: Box<dyn DocumentReader>, archive: Box<dyn PulseArchive>) -> Self {
        Self {
            reader,
            archive,
            layout: ArchiveLayout::default(),
            scratch_root: None,
        }
    }

    pub fn with_layout(mut self, layout: ArchiveLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Create scratch directories for archive extraction under `root`
    /// instead of the system temp directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// Parse the supervisory document, then the waveforms of its nominal
    /// scenario.
    pub fn load_files(&self, files: &SettingsFiles) -> Result<SettingsModel, LoadError> {
        let dcs = self.reader.read_supervisory(&files.sup)?;
        let waveforms = self
            .reader
            .read_waveforms(&dcs.nominal_scenario, &files.dp)?;

        info!(
            scenario = %dcs.nominal_scenario,
            loaded = dcs.is_loaded,
            waveforms = waveforms.len(),
            "Loaded pulse settings"
        );
        Ok(SettingsModel::new(dcs, waveforms))
    }

    /// Fetch the pulse's settings bundle from the archive and load it.
    ///
    /// The bundle and the extracted documents live in a scratch directory
    /// that is removed when this returns, whatever the outcome.
    pub fn load_pulse(&self, pulse: u64) -> Result<SettingsModel, LoadError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pppat-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(LoadError::Scratch)?;

        let bundle = scratch.path().join(&self.layout.bundle_name);
        let status = self.archive.fetch(pulse, &self.layout.category, &bundle);
        if status != 0 {
            return Err(LoadError::Retrieval { pulse, status });
        }
        if !TgzBundle::is_archive(&bundle) {
            return Err(LoadError::InvalidArchive { path: bundle });
        }

        let dp = TgzBundle::extract_entry(&bundle, &self.layout.dp_entry, scratch.path())?;
        let sup = TgzBundle::extract_entry(&bundle, &self.layout.sup_entry, scratch.path())?;
        debug!(pulse, sup = %sup.display(), dp = %dp.display(), "Extracted pulse settings");

        self.load_files(&SettingsFiles { sup, dp })
    }

    /// Load the live settings held by the session leader.
    pub fn load_session_leader(&self) -> Result<SettingsModel, LoadError> {
        Err(LoadError::NotImplemented)
    }
}
