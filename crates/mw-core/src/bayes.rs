//! Gamma-Poisson rate estimation.
//!
//! The posterior is recomputed from the current window on every snapshot:
//! `α = α_prior + Σ window`, `β = β_prior + len(window)`. Counts that fall out
//! of the window no longer inform the estimate.

use serde::{Deserialize, Serialize};

use mw_config::engine::{DensityDomain, GammaPrior};
use mw_math::{gamma_cdf, gamma_mean, gamma_pdf, gamma_var, linspace};

/// Gamma(α, β) belief about the meteor rate (rate parameterization).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaPosterior {
    pub alpha: f64,
    pub beta: f64,
}

impl GammaPosterior {
    pub fn mean(&self) -> f64 {
        gamma_mean(self.alpha, self.beta)
    }

    pub fn variance(&self) -> f64 {
        gamma_var(self.alpha, self.beta)
    }

    pub fn pdf(&self, x: f64) -> f64 {
        gamma_pdf(x, self.alpha, self.beta)
    }

    pub fn cdf(&self, x: f64) -> f64 {
        gamma_cdf(x, self.alpha, self.beta)
    }
}

/// Posterior parameters and moments as published on snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    pub alpha: f64,
    pub beta: f64,
    pub mean: f64,
    pub variance: f64,
    /// Share of posterior mass inside the plotted domain.
    pub mass_in_domain: f64,
}

/// Posterior density sampled over the plotting domain.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityCurve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl DensityCurve {
    /// Number of non-finite density values.
    pub fn non_finite(&self) -> usize {
        self.y.iter().filter(|v| !v.is_finite()).count()
    }
}

/// Conjugate rate estimator with a fixed prior and plotting domain.
#[derive(Debug, Clone, PartialEq)]
pub struct RateEstimator {
    prior: GammaPrior,
    domain: DensityDomain,
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new(GammaPrior::default(), DensityDomain::default())
    }
}

impl RateEstimator {
    pub fn new(prior: GammaPrior, domain: DensityDomain) -> Self {
        Self { prior, domain }
    }

    pub fn prior(&self) -> &GammaPrior {
        &self.prior
    }

    pub fn domain(&self) -> &DensityDomain {
        &self.domain
    }

    /// Posterior from the prior and the window contents alone.
    pub fn posterior(&self, window: &[u32]) -> GammaPosterior {
        let sum: u64 = window.iter().map(|&v| u64::from(v)).sum();
        GammaPosterior {
            alpha: self.prior.shape + sum as f64,
            beta: self.prior.rate + window.len() as f64,
        }
    }

    /// Evaluation grid: `points` evenly spaced values on `[min, max]`.
    pub fn grid(&self) -> Vec<f64> {
        linspace(self.domain.min, self.domain.max, self.domain.points)
    }

    pub fn density_curve(&self, posterior: &GammaPosterior) -> DensityCurve {
        let x = self.grid();
        let y = x.iter().map(|&xi| posterior.pdf(xi)).collect();
        DensityCurve { x, y }
    }

    pub fn summarize(&self, posterior: &GammaPosterior) -> PosteriorSummary {
        let mass = posterior.cdf(self.domain.max) - posterior.cdf(self.domain.min);
        PosteriorSummary {
            alpha: posterior.alpha,
            beta: posterior.beta,
            mean: posterior.mean(),
            variance: posterior.variance(),
            mass_in_domain: mass,
        }
    }
}
