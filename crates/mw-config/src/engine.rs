//! Engine configuration types.
//!
//! Every section has a built-in default, so a config file only needs to name
//! the values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::load::ConfigError;

/// Complete engine configuration (engine.json).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub schema_version: String,

    pub window: WindowConfig,

    pub regimes: RegimeConfig,

    pub prior: GammaPrior,

    pub density: DensityDomain,

    pub forecast: ForecastConfig,

    pub publisher: PublisherConfig,

    pub seed_history: SeedHistoryConfig,

    /// Fixed RNG seed; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            window: WindowConfig::default(),
            regimes: RegimeConfig::default(),
            prior: GammaPrior::default(),
            density: DensityDomain::default(),
            forecast: ForecastConfig::default(),
            publisher: PublisherConfig::default(),
            seed_history: SeedHistoryConfig::default(),
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Parse a config from a JSON string. Does not validate semantics.
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Read and parse a config file. Does not validate semantics.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        crate::load::read_config_file(path).map(|(config, _)| config)
    }
}

/// Rolling window sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

/// A named regime and its expected meteors per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSpec {
    pub name: String,
    pub rate: u32,
}

/// Markov regime model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub states: Vec<RegimeSpec>,

    /// Row-stochastic matrix; row `i` is the next-state distribution from state `i`.
    pub transition_matrix: Vec<Vec<f64>>,

    pub initial_state: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        let rates = [1, 3, 7];
        Self {
            states: crate::REGIME_NAMES
                .iter()
                .zip(rates)
                .map(|(name, rate)| RegimeSpec {
                    name: (*name).to_string(),
                    rate,
                })
                .collect(),
            transition_matrix: vec![
                vec![0.6, 0.3, 0.1],
                vec![0.2, 0.5, 0.3],
                vec![0.1, 0.3, 0.6],
            ],
            initial_state: 1,
        }
    }
}

/// Gamma prior on the meteor rate: Gamma(shape, rate).
/// Note: uses RATE parameterization (rate = 1/scale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GammaPrior {
    pub shape: f64,
    pub rate: f64,
}

impl Default for GammaPrior {
    fn default() -> Self {
        Self {
            shape: 2.0,
            rate: 1.0,
        }
    }
}

/// Domain over which the posterior density curve is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityDomain {
    pub min: f64,
    pub max: f64,
    pub points: usize,
}

impl Default for DensityDomain {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 10.0,
            points: 100,
        }
    }
}

/// Moving-average forecaster parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of future cycles to predict.
    pub horizon: usize,
    /// Maximum number of recent points averaged.
    pub window: usize,
    /// Central confidence level for the margin, in (0, 1).
    pub confidence_level: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 10,
            window: 10,
            confidence_level: 0.95,
        }
    }
}

/// Snapshot fan-out settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Snapshots buffered per subscriber before the oldest is dropped.
    pub mailbox_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 16,
        }
    }
}

/// Synthetic history loaded at startup: `count` independent Poisson(lambda)
/// draws into each window. `count = 0` disables seeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedHistoryConfig {
    pub count: usize,
    pub lambda: f64,
}

impl Default for SeedHistoryConfig {
    fn default() -> Self {
        Self {
            count: 10,
            lambda: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_parameters() {
        let config = EngineConfig::default();
        assert_eq!(config.window.capacity, 100);
        assert_eq!(config.regimes.initial_state, 1);
        let rates: Vec<u32> = config.regimes.states.iter().map(|s| s.rate).collect();
        assert_eq!(rates, vec![1, 3, 7]);
        assert_eq!(config.prior, GammaPrior { shape: 2.0, rate: 1.0 });
        assert_eq!(config.forecast.horizon, 10);
        assert_eq!(config.density.points, 100);
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = EngineConfig::from_json_str(r#"{"window":{"capacity":25},"rng_seed":7}"#)
            .expect("parse partial config");
        assert_eq!(config.window.capacity, 25);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.forecast, ForecastConfig::default());
        assert_eq!(config.schema_version, crate::CONFIG_SCHEMA_VERSION);
    }

    #[test]
    fn empty_object_is_default() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn serialization_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = EngineConfig::from_json_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(EngineConfig::from_json_str(r#"{"window": 3"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"window": {"capacity": "big"}}"#).is_err());
    }
}
