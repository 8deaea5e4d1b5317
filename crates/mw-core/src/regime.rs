//! First-order Markov model over meteor-rate regimes.
//!
//! Each regime carries a constant expected rate. On every accepted
//! observation the model draws its next regime from the current row of a
//! row-stochastic transition matrix.

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};

use mw_config::engine::RegimeConfig;

use crate::error::{EngineError, Result};

/// A named regime and its expected meteors per cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regime {
    pub name: String,
    pub rate: u32,
}

/// Serializable view of the model for snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkovData {
    pub states: Vec<String>,
    pub rates: Vec<u32>,
    pub current_index: usize,
}

/// Row-stochastic transition matrix with a prepared sampler per row.
#[derive(Debug, Clone)]
pub struct TransitionMatrix {
    rows: Vec<Vec<f64>>,
    samplers: Vec<WeightedIndex<f64>>,
}

impl TransitionMatrix {
    /// Build from square rows. Rows must be non-negative with a positive sum.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        let mut samplers = Vec::with_capacity(n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(EngineError::InvalidParameters(format!(
                    "transition row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            let sampler = WeightedIndex::new(row).map_err(|e| {
                EngineError::InvalidParameters(format!("transition row {}: {}", i, e))
            })?;
            samplers.push(sampler);
        }
        Ok(Self { rows, samplers })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Next-state probabilities from state `i`.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    fn sample<R: Rng + ?Sized>(&self, from: usize, rng: &mut R) -> usize {
        self.samplers[from].sample(rng)
    }
}

/// Markov chain over a fixed, ordered set of regimes.
#[derive(Debug, Clone)]
pub struct MarkovRegimeModel {
    regimes: Vec<Regime>,
    matrix: TransitionMatrix,
    current: usize,
    transitions: u64,
}

impl MarkovRegimeModel {
    pub fn new(regimes: Vec<Regime>, matrix: TransitionMatrix, initial: usize) -> Result<Self> {
        if regimes.is_empty() || regimes.len() != matrix.len() {
            return Err(EngineError::InvalidParameters(format!(
                "{} regimes but a {}x{} transition matrix",
                regimes.len(),
                matrix.len(),
                matrix.len()
            )));
        }
        if initial >= regimes.len() {
            return Err(EngineError::InvalidParameters(format!(
                "initial regime {} out of range",
                initial
            )));
        }
        Ok(Self {
            regimes,
            matrix,
            current: initial,
            transitions: 0,
        })
    }

    pub fn from_config(config: &RegimeConfig) -> Result<Self> {
        let regimes = config
            .states
            .iter()
            .map(|s| Regime {
                name: s.name.clone(),
                rate: s.rate,
            })
            .collect();
        let matrix = TransitionMatrix::new(config.transition_matrix.clone())?;
        Self::new(regimes, matrix, config.initial_state)
    }

    /// Draw the next regime from the current row and move to it.
    /// Self-transitions are allowed and still count as a transition.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        self.current = self.matrix.sample(self.current, rng);
        self.transitions += 1;
        self.current
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &Regime {
        &self.regimes[self.current]
    }

    pub fn regimes(&self) -> &[Regime] {
        &self.regimes
    }

    pub fn matrix(&self) -> &TransitionMatrix {
        &self.matrix
    }

    /// Number of `advance` calls so far.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn snapshot(&self) -> MarkovData {
        MarkovData {
            states: self.regimes.iter().map(|r| r.name.clone()).collect(),
            rates: self.regimes.iter().map(|r| r.rate).collect(),
            current_index: self.current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn default_model() -> MarkovRegimeModel {
        MarkovRegimeModel::from_config(&RegimeConfig::default()).unwrap()
    }

    #[test]
    fn starts_in_medium() {
        let model = default_model();
        assert_eq!(model.current_index(), 1);
        assert_eq!(model.current().name, "medium");
        assert_eq!(model.current().rate, 3);
        assert_eq!(model.transitions(), 0);
    }

    #[test]
    fn snapshot_lists_states_and_rates() {
        let data = default_model().snapshot();
        assert_eq!(data.states, vec!["low", "medium", "high"]);
        assert_eq!(data.rates, vec![1, 3, 7]);
        assert_eq!(data.current_index, 1);
    }

    #[test]
    fn default_rows_are_stochastic() {
        let model = default_model();
        for i in 0..model.matrix().len() {
            let sum: f64 = model.matrix().row(i).unwrap().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn advance_stays_in_range_and_counts() {
        let mut model = default_model();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(model.advance(&mut rng) <= 2);
        }
        assert_eq!(model.transitions(), 500);
    }

    #[test]
    fn advance_follows_current_row_frequencies() {
        // From medium the next state is low/medium/high with 0.2/0.5/0.3.
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts = [0usize; 3];
        let trials = 20_000;
        for _ in 0..trials {
            let mut model = default_model();
            counts[model.advance(&mut rng)] += 1;
        }
        for (observed, expected) in counts.iter().zip([0.2, 0.5, 0.3]) {
            let freq = *observed as f64 / trials as f64;
            assert!((freq - expected).abs() < 0.02, "freq {} vs {}", freq, expected);
        }
    }

    #[test]
    fn absorbing_row_never_leaves() {
        let matrix = TransitionMatrix::new(vec![vec![1.0, 0.0], vec![0.5, 0.5]]).unwrap();
        let regimes = vec![
            Regime {
                name: "a".into(),
                rate: 1,
            },
            Regime {
                name: "b".into(),
                rate: 2,
            },
        ];
        let mut model = MarkovRegimeModel::new(regimes, matrix, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(model.advance(&mut rng), 0);
        }
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(TransitionMatrix::new(vec![vec![0.5, 0.5], vec![1.0]]).is_err());
        assert!(TransitionMatrix::new(vec![vec![0.0, 0.0], vec![0.5, 0.5]]).is_err());

        let matrix = TransitionMatrix::new(vec![vec![1.0]]).unwrap();
        let regimes = vec![Regime {
            name: "only".into(),
            rate: 1,
        }];
        assert!(MarkovRegimeModel::new(regimes, matrix, 1).is_err());
    }
}
