//! Meteorwatch Core Library
//!
//! Streaming inference over meteor counts:
//! - Rolling observation windows
//! - Markov regime model over arrival rates
//! - Gamma-Poisson rate posterior
//! - Moving-average forecast with a confidence band
//! - Snapshot fan-out to subscribers
//!
//! The binary entry point is in `main.rs`.

pub mod bayes;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod forecast;
pub mod logging;
pub mod publisher;
pub mod regime;
pub mod report;
pub mod simulate;
pub mod snapshot;
pub mod window;

pub use engine::{Engine, EngineStats};
pub use error::{EngineError, ErrorCategory};
pub use publisher::{SnapshotPublisher, Subscription};
pub use snapshot::{ComputationWarning, Snapshot};
