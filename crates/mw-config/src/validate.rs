//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::engine::EngineConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Tolerance for transition-matrix row sums.
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

/// Validate an engine configuration semantically.
pub fn validate_engine_config(config: &EngineConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    if config.window.capacity == 0 {
        return Err(invalid("window.capacity", "Must be at least 1"));
    }

    validate_regimes(config)?;

    validate_positive("prior.shape", config.prior.shape)?;
    validate_positive("prior.rate", config.prior.rate)?;

    let density = &config.density;
    if !density.min.is_finite() || !density.max.is_finite() || density.min >= density.max {
        return Err(invalid(
            "density",
            format!(
                "Need finite min < max, got min={} max={}",
                density.min, density.max
            ),
        ));
    }
    if density.points < 2 {
        return Err(invalid(
            "density.points",
            format!("Must be at least 2, got {}", density.points),
        ));
    }

    let forecast = &config.forecast;
    if forecast.horizon == 0 {
        return Err(invalid("forecast.horizon", "Must be at least 1"));
    }
    if forecast.window < 2 {
        return Err(invalid(
            "forecast.window",
            format!("Must be at least 2, got {}", forecast.window),
        ));
    }
    if !(forecast.confidence_level > 0.0 && forecast.confidence_level < 1.0) {
        return Err(invalid(
            "forecast.confidence_level",
            format!("Must be in (0, 1), got {}", forecast.confidence_level),
        ));
    }

    if config.publisher.mailbox_capacity == 0 {
        return Err(invalid("publisher.mailbox_capacity", "Must be at least 1"));
    }

    if config.seed_history.count > 0 {
        validate_positive("seed_history.lambda", config.seed_history.lambda)?;
        if config.seed_history.lambda > crate::MAX_SEED_LAMBDA {
            return Err(invalid(
                "seed_history.lambda",
                format!(
                    "Must be at most {}, got {}",
                    crate::MAX_SEED_LAMBDA,
                    config.seed_history.lambda
                ),
            ));
        }
    }

    Ok(())
}

fn validate_regimes(config: &EngineConfig) -> ValidationResult<()> {
    let regimes = &config.regimes;
    let names: Vec<&str> = regimes.states.iter().map(|s| s.name.as_str()).collect();
    if names != crate::REGIME_NAMES {
        return Err(ValidationError::SemanticError(format!(
            "Regimes must be {:?} in order, got {:?}",
            crate::REGIME_NAMES,
            names
        )));
    }

    let n = regimes.states.len();
    if regimes.transition_matrix.len() != n {
        return Err(invalid(
            "regimes.transition_matrix",
            format!("Expected {} rows, got {}", n, regimes.transition_matrix.len()),
        ));
    }

    for (i, row) in regimes.transition_matrix.iter().enumerate() {
        let field = format!("regimes.transition_matrix[{}]", i);
        if row.len() != n {
            return Err(invalid(
                field,
                format!("Expected {} entries, got {}", n, row.len()),
            ));
        }
        if let Some(p) = row.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(invalid(
                field,
                format!("Probabilities must be in [0, 1], got {}", p),
            ));
        }
        let sum: f64 = row.iter().sum();
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(ValidationError::SemanticError(format!(
                "Row {} of the transition matrix must sum to 1.0, got {}",
                i, sum
            )));
        }
    }

    if regimes.initial_state >= n {
        return Err(invalid(
            "regimes.initial_state",
            format!("Must be < {}, got {}", n, regimes.initial_state),
        ));
    }

    Ok(())
}

fn validate_positive(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            field,
            format!("Must be finite and > 0, got {}", value),
        ));
    }
    Ok(())
}
