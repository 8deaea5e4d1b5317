//! Configuration snapshots for startup logging and reproducibility.
//!
//! A snapshot records which engine config a process started with, so a
//! stream of published snapshots can be tied back to its parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::EngineConfig;
use crate::resolve::ResolvedConfig;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// Source of the engine configuration.
    pub source: String,

    /// Path where the config was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// SHA-256 hash of the config file content (None for built-in defaults).
    #[serde(default)]
    pub content_hash: Option<String>,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub window_capacity: usize,
    pub regime_rates: Vec<u32>,
    pub initial_state: usize,
    pub prior_shape: f64,
    pub prior_rate: f64,
    pub forecast_horizon: usize,
    pub confidence_level: f64,
    pub mailbox_capacity: usize,
    pub seed_history_count: usize,
    pub rng_seed: Option<u64>,
}

impl ConfigSnapshot {
    /// Create a new snapshot from loaded configuration.
    pub fn new(config: &EngineConfig, resolved: &ResolvedConfig, raw_json: Option<&str>) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            source: resolved.source.to_string(),
            path: resolved.path.as_ref().map(|p| p.display().to_string()),
            content_hash: raw_json.map(hash_content),
            summary: ConfigSummary::from_config(config),
        }
    }

    /// Create a snapshot with only defaults (no config file loaded).
    pub fn defaults_only() -> Self {
        Self::new(&EngineConfig::default(), &ResolvedConfig::default(), None)
    }
}

impl ConfigSummary {
    fn from_config(config: &EngineConfig) -> Self {
        ConfigSummary {
            window_capacity: config.window.capacity,
            regime_rates: config.regimes.states.iter().map(|s| s.rate).collect(),
            initial_state: config.regimes.initial_state,
            prior_shape: config.prior.shape,
            prior_rate: config.prior.rate,
            forecast_horizon: config.forecast.horizon,
            confidence_level: config.forecast.confidence_level,
            mailbox_capacity: config.publisher.mailbox_capacity,
            seed_history_count: config.seed_history.count,
            rng_seed: config.rng_seed,
        }
    }
}

/// Compute SHA-256 hash of content.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
