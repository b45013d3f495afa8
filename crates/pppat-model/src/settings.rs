use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::waveform::WaveformStore;

/// Metadata read from the supervisory document (Sup.xml).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcsSettings {
    /// Scenario selecting which waveforms of the program document apply.
    pub nominal_scenario: String,
    /// Whether the supervisory document reported itself as loaded.
    pub is_loaded: bool,
}

impl DcsSettings {
    pub fn new(nominal_scenario: impl Into<String>, is_loaded: bool) -> Self {
        Self {
            nominal_scenario: nominal_scenario.into(),
            is_loaded,
        }
    }
}

/// The settings of one pulse: supervisory metadata plus its waveforms.
///
/// Built in one piece by the loader and never mutated afterwards. The
/// waveform store sits behind an `Arc` so concurrent checks can share it.
#[derive(Debug, Clone, Default)]
pub struct SettingsModel {
    dcs: DcsSettings,
    waveforms: Arc<WaveformStore>,
}

impl SettingsModel {
    pub fn new(dcs: DcsSettings, waveforms: WaveformStore) -> Self {
        Self {
            dcs,
            waveforms: Arc::new(waveforms),
        }
    }

    /// A model with no metadata and no waveforms.
    pub fn unloaded() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.dcs.is_loaded
    }

    pub fn nominal_scenario(&self) -> &str {
        &self.dcs.nominal_scenario
    }

    pub fn dcs(&self) -> &DcsSettings {
        &self.dcs
    }

    pub fn waveforms(&self) -> &WaveformStore {
        &self.waveforms
    }

    /// Shared handle to the store, for handing to rule executors.
    pub fn shared_waveforms(&self) -> Arc<WaveformStore> {
        Arc::clone(&self.waveforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::Waveform;

    #[test]
    fn test_unloaded_model() {
        let model = SettingsModel::unloaded();
        assert!(!model.is_loaded());
        assert!(model.waveforms().is_empty());
        assert_eq!(model.nominal_scenario(), "");
    }

    #[test]
    fn test_loaded_flag_follows_supervisory_document() {
        let store = WaveformStore::new()
            .with_waveform(Waveform::from_samples("a", [(0.0, 1.0)]).unwrap());
        let model = SettingsModel::new(DcsSettings::new("Ohmic", false), store);
        assert!(!model.is_loaded());
        assert_eq!(model.waveforms().len(), 1);
    }

    #[test]
    fn test_shared_store_is_same_allocation() {
        let model = SettingsModel::new(DcsSettings::new("Ohmic", true), WaveformStore::new());
        let a = model.shared_waveforms();
        let b = model.shared_waveforms();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
