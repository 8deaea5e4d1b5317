//! Error types for the meteorwatch engine and CLI.
//!
//! Errors carry stable codes for machine parsing and a category for
//! grouping. Ingestion rejections are ordinary values, not failures of the
//! engine: the engine keeps running after any of these.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mw_config::ConfigError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Engine configuration errors.
    Config,
    /// Rejected or unparseable observations.
    Input,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    // Configuration errors (10-19)
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid engine parameters: {0}")]
    InvalidParameters(String),

    // Input errors (20-29)
    #[error("invalid observation {count}: counts must be positive and at most {max}", max = u32::MAX)]
    InvalidObservation { count: i64 },

    #[error("line {line}: cannot parse observation {input:?}")]
    ParseObservation { line: usize, input: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Returns the error code for this error type.
    ///
    /// - 10-19: Configuration errors
    /// - 20-29: Input errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            EngineError::Config(_) => 10,
            EngineError::InvalidParameters(_) => 11,
            EngineError::InvalidObservation { .. } => 20,
            EngineError::ParseObservation { .. } => 21,
            EngineError::Io(_) => 60,
            EngineError::Serialization(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Config(_) | EngineError::InvalidParameters(_) => ErrorCategory::Config,
            EngineError::InvalidObservation { .. } | EngineError::ParseObservation { .. } => {
                ErrorCategory::Input
            }
            EngineError::Io(_) | EngineError::Serialization(_) => ErrorCategory::Io,
        }
    }

    /// Whether processing can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Input)
    }
}
