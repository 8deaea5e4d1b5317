//! Structured event definitions for logging.
//!
//! Every event carries the run ID and host ID of the process plus the
//! pipeline stage that produced it.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Processing stages in the engine pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup, configuration and seeding.
    Init,
    /// Observation validation and window updates.
    Ingest,
    /// Regime transition and rate posterior.
    Infer,
    /// Moving-average forecast.
    Forecast,
    /// Snapshot fan-out.
    Publish,
    /// Chart data generation.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Ingest => "ingest",
            Stage::Infer => "infer",
            Stage::Forecast => "forecast",
            Stage::Publish => "publish",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names, used as tracing targets.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Engine
    pub const HISTORY_SEEDED: &str = "engine.history_seeded";
    pub const OBSERVATION_ACCEPTED: &str = "engine.observation_accepted";
    pub const OBSERVATION_REJECTED: &str = "engine.observation_rejected";
    pub const REGIME_TRANSITION: &str = "engine.regime_transition";

    // Publish
    pub const SNAPSHOT_PUBLISHED: &str = "publish.snapshot";
    pub const SUBSCRIBER_LAGGED: &str = "publish.subscriber_lagged";

    // Numerical trouble in derived values
    pub const COMPUTE_WARNING: &str = "compute.warning";

    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";

    // Input stream
    pub const INPUT_PARSE_ERROR: &str = "input.parse_error";

    // Reporting
    pub const REPORT_BUILT: &str = "report.built";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Run and host IDs shared by every event of one process.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub host_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, host_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            host_id: host_id.into(),
        }
    }

    /// Fresh context for this process.
    pub fn for_process() -> Self {
        Self::new(super::generate_run_id(), super::get_host_id())
    }

    /// Span carrying run/host IDs; the JSONL layer attaches them to every
    /// event emitted inside it.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("mw_run", run_id = %self.run_id, host_id = %self.host_id)
    }
}
