//! Loading: resolve a path, parse it, validate it and take a snapshot.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::EngineConfig;
use crate::resolve::{resolve_config, ResolvedConfig};
use crate::snapshot::ConfigSnapshot;
use crate::validate::{validate_engine_config, ValidationError};

/// Errors raised while loading an engine config.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A validated engine config plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: EngineConfig,
    pub resolved: ResolvedConfig,
    pub snapshot: ConfigSnapshot,
}

impl LoadedConfig {
    /// Built-in defaults, no file involved.
    pub fn defaults() -> Self {
        LoadedConfig {
            config: EngineConfig::default(),
            resolved: ResolvedConfig::default(),
            snapshot: ConfigSnapshot::defaults_only(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.resolved.path.is_none()
    }
}

/// Resolve, read, parse and validate the engine config.
///
/// Falls back to built-in defaults when nothing is found. An explicit CLI
/// path that does not exist is an error rather than a silent fallback.
pub fn load_config(cli_path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let resolved = resolve_config(cli_path);
    let Some(path) = resolved.path.clone() else {
        return Ok(LoadedConfig::defaults());
    };

    let (config, raw) = read_config_file(&path)?;
    validate_engine_config(&config)?;
    let snapshot = ConfigSnapshot::new(&config, &resolved, Some(&raw));

    Ok(LoadedConfig {
        config,
        resolved,
        snapshot,
    })
}

/// Read and parse one config file without validating it. Returns the raw
/// content alongside for hashing.
pub fn read_config_file(path: &Path) -> Result<(EngineConfig, String), ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let config = EngineConfig::from_json_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((config, raw))
}
