//! Pulse archive retrieval and the bundle it returns.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where the DCS documents live in the pulse archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveLayout {
    /// Archive category holding the XEDIT-to-DCS bundle.
    pub category: String,
    /// File name the bundle is fetched to.
    pub bundle_name: String,
    /// Entry name of the supervisory document inside the bundle.
    pub sup_entry: String,
    /// Entry name of the waveform program document inside the bundle.
    pub dp_entry: String,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self {
            category: "FXEDIT2DCS".to_string(),
            bundle_name: "FXEDIT2DCS.tgz".to_string(),
            sup_entry: "Sup.xml".to_string(),
            dp_entry: "DP.xml".to_string(),
        }
    }
}

/// The facility's pulse archive service.
pub trait PulseArchive: Send + Sync {
    /// Fetch the `category` file of `pulse` into `destination`.
    ///
    /// Returns a POSIX-style status: 0 on success, anything else on failure.
    fn fetch(&self, pulse: u64, category: &str, destination: &Path) -> i32;
}

/// A local mirror of the pulse archive laid out as `<root>/<pulse>/<category>`.
///
/// Used for offline work and tests.
#[derive(Debug, Clone)]
pub struct MirrorArchive {
    root: PathBuf,
}

/// Status returned when the mirror has no such file.
const STATUS_NOT_FOUND: i32 = 2;
/// Status returned for any other I/O failure without an OS error code.
const STATUS_IO: i32 = 5;

impl MirrorArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of a category file in the mirror.
    pub fn entry_path(&self, pulse: u64, category: &str) -> PathBuf {
        self.root.join(pulse.to_string()).join(category)
    }
}

impl PulseArchive for MirrorArchive {
    fn fetch(&self, pulse: u64, category: &str, destination: &Path) -> i32 {
        let source = self.entry_path(pulse, category);
        match fs::copy(&source, destination) {
            Ok(bytes) => {
                debug!(pulse, category, bytes, "Fetched archive file from mirror");
                0
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => STATUS_NOT_FOUND,
            Err(err) => err.raw_os_error().unwrap_or(STATUS_IO),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Cannot read archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Entry '{entry}' not found in archive {path}")]
    MissingEntry { path: PathBuf, entry: String },
}

/// A tar bundle, gzip-compressed or not.
pub struct TgzBundle;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

impl TgzBundle {
    fn open(path: &Path) -> io::Result<tar::Archive<Box<dyn Read>>> {
        let mut magic = [0u8; 2];
        let gzipped = match File::open(path)?.read_exact(&mut magic) {
            Ok(()) => magic == GZIP_MAGIC,
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => false,
            Err(err) => return Err(err),
        };
        let file = BufReader::new(File::open(path)?);
        let reader: Box<dyn Read> = if gzipped {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(tar::Archive::new(reader))
    }

    /// True if `path` is a readable tar archive holding at least one entry.
    pub fn is_archive(path: &Path) -> bool {
        let Ok(mut archive) = Self::open(path) else {
            return false;
        };
        let Ok(entries) = archive.entries() else {
            return false;
        };
        let mut count = 0usize;
        for entry in entries {
            if entry.is_err() {
                return false;
            }
            count += 1;
        }
        count > 0
    }

    /// Extract the entry named `entry` into `dest_dir`, returning the path
    /// written. Only the entry's file name is used for the output path.
    pub fn extract_entry(path: &Path, entry: &str, dest_dir: &Path) -> Result<PathBuf, ArchiveError> {
        let io_err = |source: io::Error| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        };

        let wanted = Path::new(entry);
        let mut archive = Self::open(path).map_err(io_err)?;
        for item in archive.entries().map_err(io_err)? {
            let mut item = item.map_err(io_err)?;
            let item_path = item.path().map_err(io_err)?.into_owned();
            if item_path.strip_prefix(".").unwrap_or(item_path.as_path()) != wanted {
                continue;
            }
            let Some(file_name) = wanted.file_name() else {
                break;
            };
            let target = dest_dir.join(file_name);
            item.unpack(&target).map_err(io_err)?;
            return Ok(target);
        }

        Err(ArchiveError::MissingEntry {
            path: path.to_path_buf(),
            entry: entry.to_string(),
        })
    }
}
