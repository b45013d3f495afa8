//! In-memory model of a WEST pulse's settings.
//!
//! Holds the supervisory metadata, the waveform store built from the
//! program document, and the result type every rule produces.

pub mod result;
pub mod settings;
pub mod waveform;

pub use result::{CheckResult, ResultCode};
pub use settings::{DcsSettings, SettingsModel};
pub use waveform::{get_waveform, Waveform, WaveformError, WaveformStore};
