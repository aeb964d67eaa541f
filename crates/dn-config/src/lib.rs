//! Decision-network configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for engine settings and network definition files
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation
//! - Built-in network presets
//! - Config snapshots for reproducible query output

pub mod engine;
pub mod load;
pub mod network;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use engine::{EngineSettings, OrderingName};
pub use load::{load_engine_settings, ConfigError, FileFormat, LoadedSettings};
pub use network::{NetworkSpec, VariableKindSpec, VariableSpec};
pub use preset::{get_preset, list_presets, PresetInfo, PresetName};
pub use resolve::{resolve_engine_config, ConfigSource, ResolvedPath};
pub use snapshot::{ConfigSnapshot, FileProvenance};
pub use validate::{validate_engine_settings, validate_network_spec, ValidationError};

/// Schema version for configuration and network files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

pub(crate) fn default_schema_version() -> String {
    CONFIG_SCHEMA_VERSION.to_string()
}
