//! File loading for engine settings and network definitions.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::EngineSettings;
use crate::network::NetworkSpec;
use crate::resolve::{resolve_engine_config, ConfigSource};
use crate::snapshot::FileProvenance;
use crate::validate::{validate_engine_settings, validate_network_spec, ValidationError};

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    JsonError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    TomlError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

/// On-disk format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    /// `.toml` selects TOML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => FileFormat::Toml,
            _ => FileFormat::Json,
        }
    }
}

/// Engine settings together with their provenance.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: EngineSettings,
    pub provenance: FileProvenance,
}

/// Resolve, read, parse and validate engine settings.
pub fn load_engine_settings(cli_path: Option<&Path>) -> Result<LoadedSettings, ConfigError> {
    let resolved = resolve_engine_config(cli_path);
    let Some(path) = resolved.path else {
        let settings = EngineSettings::default();
        validate_engine_settings(&settings)?;
        return Ok(LoadedSettings {
            settings,
            provenance: FileProvenance::builtin(),
        });
    };

    let (settings, hash) = EngineSettings::from_file(&path)?;
    validate_engine_settings(&settings)?;
    Ok(LoadedSettings {
        settings,
        provenance: FileProvenance {
            path: Some(path),
            source: resolved.source,
            sha256: Some(hash),
        },
    })
}

impl EngineSettings {
    /// Parse settings from a file, returning them with the file's SHA-256.
    pub fn from_file(path: &Path) -> Result<(Self, String), ConfigError> {
        let bytes = read_bytes(path)?;
        let settings = parse(path, &bytes)?;
        Ok((settings, sha256_hex(&bytes)))
    }
}

impl NetworkSpec {
    /// Parse and validate a network definition from a file.
    pub fn from_file(path: &Path) -> Result<(Self, FileProvenance), ConfigError> {
        let bytes = read_bytes(path)?;
        let spec: NetworkSpec = parse(path, &bytes)?;
        validate_network_spec(&spec)?;
        Ok((
            spec,
            FileProvenance {
                path: Some(path.to_path_buf()),
                source: ConfigSource::CliArgument,
                sha256: Some(sha256_hex(&bytes)),
            },
        ))
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read(path).map_err(|source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, ConfigError> {
    match FileFormat::from_path(path) {
        FileFormat::Json => serde_json::from_slice(bytes).map_err(|source| ConfigError::JsonError {
            path: path.to_path_buf(),
            source,
        }),
        FileFormat::Toml => {
            let text = String::from_utf8_lossy(bytes);
            toml::from_str(&text).map_err(|source| ConfigError::TomlError {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::OrderingName;
    use tempfile::TempDir;

    #[test]
    fn format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.toml")), FileFormat::Toml);
        assert_eq!(FileFormat::from_path(Path::new("a.TOML")), FileFormat::Toml);
        assert_eq!(FileFormat::from_path(Path::new("a.json")), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("a")), FileFormat::Json);
    }

    #[test]
    fn loads_explicit_toml_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "ordering = \"reverse_topological\"\ncache_orders = false\n").unwrap();

        let loaded = load_engine_settings(Some(&path)).unwrap();
        assert_eq!(loaded.settings.ordering, OrderingName::ReverseTopological);
        assert!(!loaded.settings.cache_orders);
        assert_eq!(loaded.provenance.source, ConfigSource::CliArgument);
        assert_eq!(loaded.provenance.sha256.as_ref().map(|h| h.len()), Some(64));
    }

    #[test]
    fn missing_explicit_file_is_reported() {
        let err = load_engine_settings(Some(Path::new("/nonexistent/engine.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"tie_tolerance": -1.0}"#).unwrap();
        let err = load_engine_settings(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("net.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = NetworkSpec::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::JsonError { .. }));
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(sha256_hex(b"abc"), sha256_hex(b"abc"));
        assert_ne!(sha256_hex(b"abc"), sha256_hex(b"abd"));
    }
}
