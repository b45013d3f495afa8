use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pppat_sandbox::Sandbox;
use tracing::debug;

use crate::registry::{DiscoveryError, RuleSource, UnitHandle, UnitLoadError};
use crate::rule::RuleUnit;
use crate::wasm::WasmRule;

/// File extensions recognised as rule units.
const UNIT_EXTENSIONS: &[&str] = &["wasm", "wat"];

/// A directory of WebAssembly rule units, rescanned on every run.
///
/// Each `*.wasm` or `*.wat` file is one unit; its file stem is the unit id.
/// Other files and subdirectories are ignored.
pub struct RuleDirectory {
    path: PathBuf,
    sandbox: Arc<Sandbox>,
}

impl RuleDirectory {
    pub fn new(path: impl Into<PathBuf>, sandbox: Arc<Sandbox>) -> Self {
        Self {
            path: path.into(),
            sandbox,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_unit_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| UNIT_EXTENSIONS.contains(&ext))
}

impl RuleSource for RuleDirectory {
    fn describe(&self) -> String {
        format!("rule directory {}", self.path.display())
    }

    fn discover(&self) -> Result<Vec<UnitHandle>, DiscoveryError> {
        let unreadable = |source: std::io::Error| DiscoveryError::Unreadable {
            path: self.path.clone(),
            source,
        };

        let metadata = fs::metadata(&self.path).map_err(unreadable)?;
        if !metadata.is_dir() {
            return Err(DiscoveryError::NotADirectory {
                path: self.path.clone(),
            });
        }

        let mut handles = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            let path = entry.path();
            if !path.is_file() || !is_unit_file(&path) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                debug!(path = %path.display(), "Skipping rule unit with non UTF-8 name");
                continue;
            };
            handles.push(UnitHandle {
                id: id.to_string(),
                location: path.display().to_string(),
            });
        }

        Ok(handles)
    }

    fn load(&self, handle: &UnitHandle) -> Result<RuleUnit, UnitLoadError> {
        let path = PathBuf::from(&handle.location);
        let bytes = fs::read(&path).map_err(|source| UnitLoadError::Io {
            path: path.clone(),
            source,
        })?;

        // Accepts both the binary and the text format.
        let wasm = wat::parse_bytes(&bytes).map_err(|err| UnitLoadError::Parse {
            path: path.clone(),
            message: err.to_string(),
        })?;

        let module = self
            .sandbox
            .load_module(&wasm)
            .map_err(|source| UnitLoadError::Sandbox {
                id: handle.id.clone(),
                source,
            })?;
        let module = Arc::new(module);

        let mut unit = RuleUnit::new(&handle.id);
        for (name, kind) in self.sandbox.list_exports(&module) {
            if kind != "func" {
                continue;
            }
            unit = unit.with_function(WasmRule::new(
                name,
                Arc::clone(&module),
                Arc::clone(&self.sandbox),
            ));
        }

        debug!(
            unit = %handle.id,
            functions = unit.functions().len(),
            "Loaded rule unit"
        );
        Ok(unit)
    }
}
