use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use pppat_core::{
    Checker, CheckerConfig, ExecutionMode, NullObserver, PulseSettings, SequentialExecutor,
};
use pppat_loader::{
    DocumentError, DocumentReader, MirrorArchive, PulseArchive, SettingsFiles, SettingsLoader,
};
use pppat_model::{DcsSettings, ResultCode, Waveform, WaveformStore};
use pppat_rules::StaticRegistry;

const IP: &str = "rts:WEST_PCS/Plasma/Ip/waveform.ref";

/// Sup: `<scenario> <loaded>`; DP: `<scenario> <peak Ip>` per line.
struct TinyReader;

fn read(path: &Path) -> Result<String, DocumentError> {
    fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn malformed(path: &Path) -> DocumentError {
    DocumentError::Malformed {
        path: path.to_path_buf(),
        message: "unexpected content".into(),
    }
}

impl DocumentReader for TinyReader {
    fn read_supervisory(&self, path: &Path) -> Result<DcsSettings, DocumentError> {
        let text = read(path)?;
        let (scenario, loaded) = text.trim().split_once(' ').ok_or_else(|| malformed(path))?;
        let loaded = loaded.parse::<bool>().map_err(|_| malformed(path))?;
        Ok(DcsSettings::new(scenario, loaded))
    }

    fn read_waveforms(&self, scenario: &str, path: &Path) -> Result<WaveformStore, DocumentError> {
        let text = read(path)?;
        for line in text.lines() {
            let Some((name, peak)) = line.trim().split_once(' ') else {
                continue;
            };
            if name != scenario {
                continue;
            }
            let peak: f64 = peak.parse().map_err(|_| malformed(path))?;
            let ip = Waveform::from_samples(IP, [(0.0, 0.0), (4.0, peak), (8.0, 0.0)])
                .map_err(|_| malformed(path))?;
            return Ok(WaveformStore::new().with_waveform(ip));
        }
        Err(DocumentError::UnknownScenario {
            scenario: scenario.to_string(),
            path: path.to_path_buf(),
        })
    }
}

struct Unreachable;

impl PulseArchive for Unreachable {
    fn fetch(&self, _pulse: u64, _category: &str, _destination: &Path) -> i32 {
        1
    }
}

fn shipped_rules() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../rules/pre_pulse")
}

fn builtin_settings(archive: impl PulseArchive + 'static) -> PulseSettings {
    let loader = SettingsLoader::new(Box::new(TinyReader), Box::new(archive));
    let checker = Checker::new(Box::new(SequentialExecutor::new()), Arc::new(NullObserver))
        .with_source(StaticRegistry::with_builtins());
    PulseSettings::new(loader, checker)
}

fn write_files(dir: &Path, sup: &str, dp: &str) -> SettingsFiles {
    let files = SettingsFiles::new(dir.join("Sup.xml"), dir.join("DP.xml"));
    fs::write(&files.sup, sup).unwrap();
    fs::write(&files.dp, dp).unwrap();
    files
}

fn write_bundle(path: &Path, entries: &[(&str, &str)]) {
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

const DP: &str = "Ohmic 950000\nLHCD 1200000\n";

#[test]
fn test_load_from_file_then_check() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = builtin_settings(Unreachable);

    assert!(settings.load_from_file(&write_files(dir.path(), "Ohmic true", DP)));
    assert_eq!(settings.model().nominal_scenario(), "Ohmic");
    let report = settings.check_all(true).unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.results()[0].code, ResultCode::Ok);

    assert!(settings.load_from_file(&write_files(dir.path(), "LHCD true", DP)));
    let report = settings.check_all(true).unwrap();
    assert_eq!(report.results()[0].code, ResultCode::Error);
}

#[test]
fn test_load_returns_dcs_loaded_flag() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = builtin_settings(Unreachable);
    assert!(!settings.load_from_file(&write_files(dir.path(), "Ohmic false", DP)));
    assert!(!settings.is_loaded());
    // Waveforms are still available to the checks.
    assert_eq!(settings.model().waveforms().len(), 1);
}

#[test]
fn test_failed_load_resets_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = builtin_settings(Unreachable);
    assert!(settings.load_from_file(&write_files(dir.path(), "Ohmic true", DP)));

    assert!(!settings.load_from_file(&write_files(dir.path(), "ICRH true", DP)));
    assert!(!settings.is_loaded());
    assert!(settings.model().waveforms().is_empty());
}

#[test]
fn test_check_without_settings_reports_missing_waveform() {
    let settings = builtin_settings(Unreachable);
    let report = settings.check_all(false).unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.results()[0].code, ResultCode::Error);
    assert!(report.results()[0].text.contains("not found!?"));
}

#[test]
fn test_load_from_pulse_database_failure() {
    let mut settings = builtin_settings(Unreachable);
    assert!(!settings.load_from_pulse(55000));
    assert!(!settings.is_loaded());
}

#[test]
fn test_load_from_pulse_mirror() {
    let root = tempfile::tempdir().unwrap();
    let mirror = MirrorArchive::new(root.path());
    fs::create_dir_all(root.path().join("55000")).unwrap();
    write_bundle(
        &mirror.entry_path(55000, "FXEDIT2DCS"),
        &[("DP.xml", DP), ("Sup.xml", "LHCD true")],
    );

    let mut settings = builtin_settings(mirror);
    assert!(settings.load_from_pulse(55000));
    assert_eq!(settings.model().nominal_scenario(), "LHCD");
    let report = settings.check_all(true).unwrap();
    assert_eq!(report.results()[0].code, ResultCode::Error);
}

#[test]
fn test_session_leader_always_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = builtin_settings(Unreachable);
    assert!(settings.load_from_file(&write_files(dir.path(), "Ohmic true", DP)));
    assert!(!settings.load_from_session_leader());
    assert!(!settings.is_loaded());
}

#[test]
fn test_from_config_with_shipped_rules() {
    let mut config = CheckerConfig::default();
    config.rule_dir = Some(shipped_rules());
    config.execution.mode = ExecutionMode::Parallel;
    config.execution.max_threads = 2;

    let dir = tempfile::tempdir().unwrap();
    let mut settings =
        PulseSettings::from_config(&config, Box::new(TinyReader), Box::new(Unreachable)).unwrap();
    assert!(settings.load_from_file(&write_files(dir.path(), "Ohmic true", DP)));

    let report = settings.check_all(true).unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.results()[0].name, "WOI 3.7: plasma current");
    assert_eq!(report.results()[0].code, ResultCode::Ok);
}

#[test]
fn test_from_config_parallel_with_default_thread_count() {
    let config = CheckerConfig::from_json_str(&format!(
        r#"{{"rule_dir": {}, "execution": {{"mode": "parallel", "max_threads": 0}}}}"#,
        serde_json::to_string(&shipped_rules()).unwrap()
    ))
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut settings =
        PulseSettings::from_config(&config, Box::new(TinyReader), Box::new(Unreachable)).unwrap();
    assert!(settings.load_from_file(&write_files(dir.path(), "LHCD true", DP)));
    let report = settings.check_all(true).unwrap();
    assert_eq!(report.results()[0].code, ResultCode::Error);
}

#[test]
fn test_from_config_rejects_invalid_config() {
    let mut config = CheckerConfig::default();
    config.execution.rule_timeout_ms = Some(0);
    assert!(
        PulseSettings::from_config(&config, Box::new(TinyReader), Box::new(Unreachable)).is_err()
    );
}
