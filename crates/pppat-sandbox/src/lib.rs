//! WebAssembly sandbox for rule units loaded at run time.
//!
//! A rule unit is a WASM module exporting `check_*` functions. It sees the
//! pulse's waveforms only through the read-only `pulse` host module defined
//! in [`host`].

pub mod config;
pub mod host;
pub mod sandbox;

pub use config::SandboxConfig;
pub use sandbox::{GuestOutcome, LoadedModule, Sandbox, SandboxError};
