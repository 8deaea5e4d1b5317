//! Plot-ready chart data derived from a snapshot.
//!
//! Four charts: regime rates with the active regime highlighted, region
//! counts with the forecast band, the posterior density with the current
//! moving-average rate, and a historical-vs-predicted distribution
//! comparison. Nothing here renders images; consumers draw from the JSON.

use serde::{Deserialize, Serialize};

use mw_math::{mean, FiveNumberSummary};

use crate::forecast::Forecaster;
use crate::logging::{event_names, Stage};
use crate::snapshot::{ComputationWarning, Snapshot};

/// Upper y-axis limit of the regime chart.
pub const MARKOV_Y_MAX: f64 = 10.0;

const REGIME_COLORS: [&str; 3] = ["blue", "green", "red"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeBar {
    pub label: String,
    pub rate: u32,
    pub color: String,
    /// Drawn with a heavy outline.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkovChart {
    pub title: String,
    pub ylabel: String,
    pub y_max: f64,
    pub bars: Vec<RegimeBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Shaded region between two curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub label: String,
    pub x: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesChart {
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub observed: Series,
    pub predictions: Option<Series>,
    pub band: Option<Band>,
}

/// Vertical line at a point on the x-axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub label: String,
    pub x: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorChart {
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    /// Absent when the density was not finite.
    pub curve: Option<Series>,
    pub marker: Option<Marker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub label: String,
    #[serde(flatten)]
    pub summary: FiveNumberSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxComparison {
    pub title: String,
    pub ylabel: String,
    pub boxes: Vec<BoxStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartReport {
    pub generated_at: String,
    pub markov: MarkovChart,
    pub time_series: TimeSeriesChart,
    pub posterior: PosteriorChart,
    pub distribution: BoxComparison,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ComputationWarning>,
}

impl ChartReport {
    /// Build all charts from one snapshot. `forecaster` supplies the moving
    /// average window and the band's confidence level.
    pub fn build(snapshot: &Snapshot, forecaster: &Forecaster) -> Self {
        let report = Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            markov: markov_chart(snapshot),
            time_series: time_series_chart(snapshot, forecaster),
            posterior: posterior_chart(snapshot, forecaster),
            distribution: box_comparison(snapshot),
            warnings: snapshot.warnings.clone(),
        };
        tracing::info!(
            target: event_names::REPORT_BUILT,
            stage = %Stage::Report,
            observations = snapshot.region_counts.len() as u64,
            has_forecast = snapshot.has_forecast(),
            boxes = report.distribution.boxes.len() as u64,
            "Built chart report"
        );
        if !report.warnings.is_empty() {
            tracing::warn!(
                target: event_names::COMPUTE_WARNING,
                stage = %Stage::Report,
                warnings = report.warnings.len() as u64,
                "Chart report is missing series with non-finite values"
            );
        }
        report
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn markov_chart(snapshot: &Snapshot) -> MarkovChart {
    let data = &snapshot.markov_data;
    let bars = data
        .states
        .iter()
        .zip(&data.rates)
        .enumerate()
        .map(|(i, (name, &rate))| RegimeBar {
            label: name.clone(),
            rate,
            color: REGIME_COLORS[i % REGIME_COLORS.len()].to_string(),
            active: i == data.current_index,
        })
        .collect();
    MarkovChart {
        title: "Markov Chain: Meteor Arrival Rates".to_string(),
        ylabel: "Meteors per cycle".to_string(),
        y_max: MARKOV_Y_MAX,
        bars,
    }
}

fn time_series_chart(snapshot: &Snapshot, forecaster: &Forecaster) -> TimeSeriesChart {
    let history = snapshot.region_counts.len();
    let observed = Series {
        label: "Observed Meteors".to_string(),
        x: (0..history).map(|i| i as f64).collect(),
        y: snapshot.region_counts.iter().map(|&c| f64::from(c)).collect(),
    };

    let (predictions, band) = match (
        &snapshot.predictions,
        &snapshot.lower_bound,
        &snapshot.upper_bound,
    ) {
        (Some(pred), Some(lower), Some(upper)) => {
            // Predictions continue the cycle axis after the last observation.
            let x: Vec<f64> = (history..history + pred.len()).map(|i| i as f64).collect();
            let band = Band {
                label: confidence_label(forecaster.confidence_level()),
                x: x.clone(),
                lower: lower.clone(),
                upper: upper.clone(),
            };
            let series = Series {
                label: "Predictions".to_string(),
                x,
                y: pred.clone(),
            };
            (Some(series), Some(band))
        }
        _ => (None, None),
    };

    TimeSeriesChart {
        title: "Meteors in Region Over Time with Predictions".to_string(),
        xlabel: "Cycle".to_string(),
        ylabel: "Count".to_string(),
        observed,
        predictions,
        band,
    }
}

fn posterior_chart(snapshot: &Snapshot, forecaster: &Forecaster) -> PosteriorChart {
    let posterior = &snapshot.posterior;
    let curve = snapshot.y.as_ref().map(|y| Series {
        label: format!(
            "Posterior α={:.2}, β={:.2}",
            posterior.alpha, posterior.beta
        ),
        x: snapshot.x.clone(),
        y: y.clone(),
    });

    let counts = &snapshot.region_counts;
    let recent: Vec<f64> = counts[counts.len().saturating_sub(forecaster.window())..]
        .iter()
        .map(|&c| f64::from(c))
        .collect();
    let marker = Some(mean(&recent))
        .filter(|rate| rate.is_finite())
        .map(|rate| Marker {
            label: format!("Current Rate: {:.2}", rate),
            x: rate,
        });

    PosteriorChart {
        title: "Bayesian Inference: Posterior Distribution".to_string(),
        xlabel: "λ (Meteor Rate)".to_string(),
        ylabel: "Density".to_string(),
        curve,
        marker,
    }
}

fn box_comparison(snapshot: &Snapshot) -> BoxComparison {
    let historical: Vec<f64> = snapshot
        .region_counts
        .iter()
        .map(|&c| f64::from(c))
        .collect();
    let mut boxes = Vec::with_capacity(2);
    if let Some(summary) = FiveNumberSummary::from_values(&historical) {
        boxes.push(BoxStats {
            label: "Historical".to_string(),
            summary,
        });
    }
    if let Some(summary) = snapshot
        .predictions
        .as_deref()
        .and_then(FiveNumberSummary::from_values)
    {
        boxes.push(BoxStats {
            label: "Predicted".to_string(),
            summary,
        });
    }
    BoxComparison {
        title: "Distribution Comparison: Historical vs Predicted Meteors".to_string(),
        ylabel: "Count".to_string(),
        boxes,
    }
}

fn confidence_label(level: f64) -> String {
    format!("{:.0}% Confidence Interval", level * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bayes::RateEstimator;
    use crate::forecast::Forecast;
    use crate::regime::MarkovData;
    use crate::snapshot::SnapshotInputs;

    fn snapshot(counts: Vec<u32>, forecast: Option<Forecast>, current: usize) -> Snapshot {
        Snapshot::assemble(
            SnapshotInputs {
                region_counts: counts.clone(),
                observed_meteors: counts,
                markov_data: MarkovData {
                    states: vec!["low".into(), "medium".into(), "high".into()],
                    rates: vec![1, 3, 7],
                    current_index: current,
                },
                forecast,
                sequence: 1,
            },
            &RateEstimator::default(),
        )
    }

    fn flat_forecast(value: f64) -> Forecast {
        Forecast {
            predictions: vec![value; 10],
            lower_bound: vec![value - 0.5; 10],
            upper_bound: vec![value + 0.5; 10],
            moving_average: value,
            std_dev: 0.0,
            margin: 0.5,
            window_size: 10,
        }
    }

    #[test]
    fn markov_chart_highlights_current_regime() {
        let report = ChartReport::build(&snapshot(vec![3], None, 2), &Forecaster::default());
        let bars = &report.markov.bars;
        assert_eq!(bars.len(), 3);
        assert_eq!(bars.iter().filter(|b| b.active).count(), 1);
        assert!(bars[2].active);
        assert_eq!(bars[2].color, "red");
        assert_eq!(report.markov.y_max, 10.0);
        assert_eq!(report.markov.ylabel, "Meteors per cycle");
    }

    #[test]
    fn predictions_continue_the_time_axis() {
        let counts = vec![1, 2, 3, 2, 1];
        let report = ChartReport::build(
            &snapshot(counts, Some(flat_forecast(2.0)), 1),
            &Forecaster::default(),
        );
        let ts = &report.time_series;
        assert_eq!(ts.observed.x, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let pred = ts.predictions.as_ref().unwrap();
        assert_eq!(pred.x.first(), Some(&5.0));
        assert_eq!(pred.x.len(), 10);
        let band = ts.band.as_ref().unwrap();
        assert_eq!(band.label, "95% Confidence Interval");
        assert_eq!(band.lower, vec![1.5; 10]);
    }

    #[test]
    fn no_forecast_means_no_band_and_one_box() {
        let report = ChartReport::build(&snapshot(vec![4], None, 1), &Forecaster::default());
        assert!(report.time_series.predictions.is_none());
        assert!(report.time_series.band.is_none());
        assert_eq!(report.distribution.boxes.len(), 1);
        assert_eq!(report.distribution.boxes[0].label, "Historical");
    }

    #[test]
    fn posterior_labels_and_marker() {
        let report = ChartReport::build(
            &snapshot(vec![2, 4], Some(flat_forecast(3.0)), 0),
            &Forecaster::default(),
        );
        let curve = report.posterior.curve.as_ref().unwrap();
        assert_eq!(curve.label, "Posterior α=8.00, β=3.00");
        assert_eq!(curve.x.len(), 100);
        let marker = report.posterior.marker.as_ref().unwrap();
        assert_eq!(marker.x, 3.0);
        assert_eq!(marker.label, "Current Rate: 3.00");
    }

    #[test]
    fn marker_uses_recent_window_only() {
        let mut counts = vec![50u32; 5];
        counts.extend([1; 10]);
        let report = ChartReport::build(&snapshot(counts, None, 1), &Forecaster::default());
        assert_eq!(report.posterior.marker.unwrap().x, 1.0);
    }

    #[test]
    fn empty_history_has_no_marker() {
        let report = ChartReport::build(&snapshot(vec![], None, 1), &Forecaster::default());
        assert!(report.posterior.marker.is_none());
        assert!(report.distribution.boxes.is_empty());
    }

    #[test]
    fn box_stats_flatten_into_json() {
        let report = ChartReport::build(
            &snapshot(vec![1, 2, 3, 4, 5], Some(flat_forecast(2.0)), 1),
            &Forecaster::default(),
        );
        let json: serde_json::Value =
            serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        let historical = &json["distribution"]["boxes"][0];
        assert_eq!(historical["label"], "Historical");
        assert_eq!(historical["median"], 3.0);
        assert_eq!(historical["q1"], 2.0);
        assert_eq!(json["distribution"]["boxes"][1]["label"], "Predicted");
    }

    #[test]
    fn confidence_label_rounds() {
        assert_eq!(confidence_label(0.95), "95% Confidence Interval");
        assert_eq!(confidence_label(0.9), "90% Confidence Interval");
    }
}
