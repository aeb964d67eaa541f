//! Configuration snapshots for reproducible query output.
//!
//! A snapshot captures which settings and which network definition produced a
//! result, so a posterior or decision printed by the CLI can be traced back to
//! the exact inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::EngineSettings;
use crate::resolve::ConfigSource;

/// Where one input file came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProvenance {
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
    /// SHA-256 of the file bytes (None for built-in inputs).
    pub sha256: Option<String>,
}

impl FileProvenance {
    pub fn builtin() -> Self {
        Self {
            path: None,
            source: ConfigSource::BuiltinDefault,
            sha256: None,
        }
    }
}

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    pub schema_version: String,

    #[serde(default)]
    pub engine_path: Option<String>,

    pub engine_source: String,

    #[serde(default)]
    pub engine_hash: Option<String>,

    /// Network definition file, or the preset name.
    pub model: String,

    #[serde(default)]
    pub model_hash: Option<String>,

    /// Combined hash of all inputs (for quick comparison).
    pub combined_hash: String,

    pub settings: EngineSettings,
}

impl ConfigSnapshot {
    pub fn new(
        settings: &EngineSettings,
        engine: &FileProvenance,
        model: &str,
        model_hash: Option<&str>,
    ) -> Self {
        let mut combined = String::new();
        combined.push_str(engine.sha256.as_deref().unwrap_or("builtin"));
        combined.push(':');
        combined.push_str(model_hash.unwrap_or(model));
        Self {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            engine_path: engine.path.as_ref().map(|p| p.display().to_string()),
            engine_source: engine.source.to_string(),
            engine_hash: engine.sha256.clone(),
            model: model.to_string(),
            model_hash: model_hash.map(str::to_string),
            combined_hash: crate::load::sha256_hex(combined.as_bytes()),
            settings: settings.clone(),
        }
    }
}
