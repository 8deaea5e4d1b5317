//! Meteorwatch engine configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for engine.json
//! - Config resolution (CLI → env → XDG → /etc → defaults)
//! - Semantic validation
//! - Config snapshots for startup logging

pub mod engine;
pub mod load;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use engine::EngineConfig;
pub use load::{load_config, read_config_file, ConfigError, LoadedConfig};
pub use resolve::{resolve_config, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_engine_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Largest Poisson mean accepted for synthetic history.
pub const MAX_SEED_LAMBDA: f64 = 1.0e6;

/// Regime names the engine understands, in index order.
pub const REGIME_NAMES: [&str; 3] = ["low", "medium", "high"];
