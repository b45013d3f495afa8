//! Building a [`SettingsModel`](pppat_model::SettingsModel) from the DCS
//! configuration documents, given either as files or as a pulse number
//! whose archived bundle is fetched from the facility database.

pub mod archive;
pub mod documents;
pub mod loader;

pub use archive::{ArchiveError, ArchiveLayout, MirrorArchive, PulseArchive, TgzBundle};
pub use documents::{DocumentError, DocumentReader, SettingsFiles};
pub use loader::{LoadError, SettingsLoader};
