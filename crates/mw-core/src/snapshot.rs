//! Snapshot payloads published to subscribers.

use serde::{Deserialize, Serialize};

use crate::bayes::{PosteriorSummary, RateEstimator};
use crate::forecast::Forecast;
use crate::regime::MarkovData;

/// Which derived quantity produced non-finite values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSource {
    Density,
    Forecast,
}

impl std::fmt::Display for WarningSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningSource::Density => write!(f, "density"),
            WarningSource::Forecast => write!(f, "forecast"),
        }
    }
}

/// A derived field was dropped from the snapshot because it was not finite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationWarning {
    pub source: WarningSource,
    pub non_finite_values: usize,
    pub message: String,
}

impl ComputationWarning {
    pub fn new(source: WarningSource, non_finite_values: usize) -> Self {
        let fields = match source {
            WarningSource::Density => "y",
            WarningSource::Forecast => "predictions, lower_bound and upper_bound",
        };
        Self {
            source,
            non_finite_values,
            message: format!(
                "{} produced {} non-finite values; {} omitted",
                source, non_finite_values, fields
            ),
        }
    }
}

/// Immutable bundle of window contents and everything derived from them.
///
/// Shared with subscribers as `Arc<Snapshot>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub region_counts: Vec<u32>,
    pub x: Vec<f64>,
    pub y: Option<Vec<f64>>,
    pub predictions: Option<Vec<f64>>,
    pub lower_bound: Option<Vec<f64>>,
    pub upper_bound: Option<Vec<f64>>,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub markov_data: MarkovData,
    pub posterior: PosteriorSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ComputationWarning>,
    /// Count of accepted observations behind this snapshot. Used to keep
    /// delivery ordered; not part of the payload.
    #[serde(skip)]
    pub sequence: u64,
}

/// State copied out of the engine lock for snapshot assembly.
#[derive(Debug, Clone)]
pub struct SnapshotInputs {
    pub region_counts: Vec<u32>,
    pub observed_meteors: Vec<u32>,
    pub markov_data: MarkovData,
    pub forecast: Option<Forecast>,
    pub sequence: u64,
}

impl Snapshot {
    /// Derive posterior and density from the copied state and package
    /// everything. Non-finite derived values become null fields plus a
    /// warning.
    pub fn assemble(inputs: SnapshotInputs, estimator: &RateEstimator) -> Self {
        let mut warnings = Vec::new();

        let posterior = estimator.posterior(&inputs.observed_meteors);
        let curve = estimator.density_curve(&posterior);
        let bad_density = curve.non_finite();
        let y = if bad_density == 0 {
            Some(curve.y)
        } else {
            warnings.push(ComputationWarning::new(WarningSource::Density, bad_density));
            None
        };

        let forecast = match inputs.forecast {
            Some(f) if f.non_finite() > 0 => {
                warnings.push(ComputationWarning::new(
                    WarningSource::Forecast,
                    f.non_finite(),
                ));
                None
            }
            other => other,
        };
        let (predictions, lower_bound, upper_bound) = match forecast {
            Some(f) => (Some(f.predictions), Some(f.lower_bound), Some(f.upper_bound)),
            None => (None, None, None),
        };

        Snapshot {
            region_counts: inputs.region_counts,
            x: curve.x,
            y,
            predictions,
            lower_bound,
            upper_bound,
            timestamp: now_epoch_seconds(),
            markov_data: inputs.markov_data,
            posterior: estimator.summarize(&posterior),
            warnings,
            sequence: inputs.sequence,
        }
    }

    pub fn has_forecast(&self) -> bool {
        self.predictions.is_some()
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn now_epoch_seconds() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6
}
