use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WaveformError {
    #[error("Waveform '{id}' has {times} time samples but {values} values")]
    LengthMismatch {
        id: String,
        times: usize,
        values: usize,
    },

    #[error("Waveform '{id}' time base is not monotonic at sample {index}")]
    NonMonotonicTime { id: String, index: usize },

    #[error("Waveform '{id}' has a non-finite time at sample {index}")]
    NonFiniteTime { id: String, index: usize },

    #[error("Waveform stored under '{key}' is named '{id}'")]
    KeyMismatch { key: String, id: String },
}

/// A named time-series setpoint, e.g. `rts:WEST_PCS/Plasma/Ip/waveform.ref`.
///
/// Immutable once built. Deserialization goes through [`Waveform::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWaveform")]
pub struct Waveform {
    id: String,
    times: Vec<f64>,
    values: Vec<f64>,
}

#[derive(Deserialize)]
struct RawWaveform {
    id: String,
    times: Vec<f64>,
    values: Vec<f64>,
}

impl TryFrom<RawWaveform> for Waveform {
    type Error = WaveformError;

    fn try_from(raw: RawWaveform) -> Result<Self, Self::Error> {
        Waveform::new(raw.id, raw.times, raw.values)
    }
}

impl Waveform {
    /// Build a waveform from parallel time and value vectors.
    ///
    /// Times must be non-decreasing; segments of a DCS program may share a
    /// boundary instant, so equal consecutive times are accepted.
    pub fn new(
        id: impl Into<String>,
        times: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self, WaveformError> {
        let id = id.into();
        if times.len() != values.len() {
            return Err(WaveformError::LengthMismatch {
                id,
                times: times.len(),
                values: values.len(),
            });
        }
        if let Some(index) = times.iter().position(|t| !t.is_finite()) {
            return Err(WaveformError::NonFiniteTime { id, index });
        }
        if let Some(index) = times.windows(2).position(|w| w[1] < w[0]) {
            return Err(WaveformError::NonMonotonicTime {
                id,
                index: index + 1,
            });
        }
        Ok(Self { id, times, values })
    }

    /// Build a waveform from `(time, value)` samples.
    pub fn from_samples(
        id: impl Into<String>,
        samples: impl IntoIterator<Item = (f64, f64)>,
    ) -> Result<Self, WaveformError> {
        let (times, values) = samples.into_iter().unzip();
        Self::new(id, times, values)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate over `(time, value)` pairs in time order.
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest value, or None for an empty waveform. NaN samples are ignored.
    pub fn max_value(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
    }

    /// Smallest value, or None for an empty waveform. NaN samples are ignored.
    pub fn min_value(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.min(v))))
    }
}

/// All waveforms of one pulse, keyed by identifier.
///
/// Populated once by the loader. Rules only ever see `&WaveformStore`, and
/// the type has no mutating accessor past construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWaveformStore")]
pub struct WaveformStore {
    waveforms: BTreeMap<String, Waveform>,
}

#[derive(Deserialize)]
struct RawWaveformStore {
    waveforms: BTreeMap<String, Waveform>,
}

impl TryFrom<RawWaveformStore> for WaveformStore {
    type Error = WaveformError;

    fn try_from(raw: RawWaveformStore) -> Result<Self, Self::Error> {
        if let Some((key, waveform)) = raw.waveforms.iter().find(|(key, wf)| **key != wf.id) {
            return Err(WaveformError::KeyMismatch {
                key: key.clone(),
                id: waveform.id.clone(),
            });
        }
        Ok(Self {
            waveforms: raw.waveforms,
        })
    }
}

impl WaveformStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a waveform while building the store. A later waveform with the
    /// same identifier replaces the earlier one.
    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveforms.insert(waveform.id.clone(), waveform);
        self
    }

    /// Exact-match lookup.
    pub fn get(&self, id: &str) -> Option<&Waveform> {
        self.waveforms.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.waveforms.contains_key(id)
    }

    /// Identifiers in lexicographic order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.waveforms.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waveform> {
        self.waveforms.values()
    }

    pub fn len(&self) -> usize {
        self.waveforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waveforms.is_empty()
    }
}

impl FromIterator<Waveform> for WaveformStore {
    fn from_iter<I: IntoIterator<Item = Waveform>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |store, wf| store.with_waveform(wf))
    }
}

/// Look a waveform up by identifier. `None` means "not found"; whether that
/// is a problem is up to the caller.
pub fn get_waveform<'a>(id: &str, store: &'a WaveformStore) -> Option<&'a Waveform> {
    store.get(id)
}
