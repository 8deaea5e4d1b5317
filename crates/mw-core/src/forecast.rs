//! Moving-average forecaster.
//!
//! Predictions are simulated sample paths: each one is an independent draw
//! from Normal(moving average, std dev) of the recent window, so identical
//! history yields different predictions from run to run. The band is
//! `prediction ± z·σ/√n`, where `n` is the number of points averaged.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use mw_config::engine::ForecastConfig;
use mw_math::{mean, population_std_dev, two_sided_z};

/// Fewest historical points that produce a forecast.
pub const MIN_HISTORY: usize = 2;

/// Forecast output for the next `horizon` cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub predictions: Vec<f64>,
    pub lower_bound: Vec<f64>,
    pub upper_bound: Vec<f64>,
    pub moving_average: f64,
    pub std_dev: f64,
    pub margin: f64,
    pub window_size: usize,
}

impl Forecast {
    /// Number of non-finite values across predictions and bounds.
    pub fn non_finite(&self) -> usize {
        self.predictions
            .iter()
            .chain(&self.lower_bound)
            .chain(&self.upper_bound)
            .filter(|v| !v.is_finite())
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecaster {
    horizon: usize,
    window: usize,
    confidence_level: f64,
    z: f64,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::from_config(&ForecastConfig::default())
    }
}

impl Forecaster {
    pub fn new(horizon: usize, window: usize, confidence_level: f64) -> Self {
        Self {
            horizon,
            window,
            confidence_level,
            z: two_sided_z(confidence_level),
        }
    }

    pub fn from_config(config: &ForecastConfig) -> Self {
        Self::new(config.horizon, config.window, config.confidence_level)
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Most recent points averaged.
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    /// z-score for the configured confidence level.
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Forecast from region-count history. `None` with fewer than
    /// [`MIN_HISTORY`] points.
    pub fn forecast<R: Rng + ?Sized>(&self, history: &[u32], rng: &mut R) -> Option<Forecast> {
        if history.len() < MIN_HISTORY {
            return None;
        }

        let window_size = self.window.min(history.len());
        let recent: Vec<f64> = history[history.len() - window_size..]
            .iter()
            .map(|&v| f64::from(v))
            .collect();
        let moving_average = mean(&recent);
        let std_dev = population_std_dev(&recent);
        let margin = self.z * std_dev / (window_size as f64).sqrt();

        let predictions: Vec<f64> = match Normal::new(moving_average, std_dev) {
            Ok(normal) => (0..self.horizon).map(|_| normal.sample(rng)).collect(),
            // Non-finite moments surface as a computation warning downstream.
            Err(_) => vec![f64::NAN; self.horizon],
        };
        let lower_bound = predictions.iter().map(|p| p - margin).collect();
        let upper_bound = predictions.iter().map(|p| p + margin).collect();

        Some(Forecast {
            predictions,
            lower_bound,
            upper_bound,
            moving_average,
            std_dev,
            margin,
            window_size,
        })
    }
}
