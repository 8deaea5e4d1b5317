//! The streaming inference engine.
//!
//! [`Engine`] owns the only mutable state in the process: the observation
//! windows, the regime model and the RNG, behind one mutex. Ingestion updates
//! the windows and advances the regime in a single critical section, copies
//! what snapshot assembly needs, and releases the lock. The forecast is drawn
//! inside the lock because it consumes the engine RNG; posterior and density
//! are computed from the copy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};

use mw_config::{validate_engine_config, ConfigError, EngineConfig, MAX_SEED_LAMBDA};

use crate::bayes::RateEstimator;
use crate::error::{EngineError, Result};
use crate::forecast::Forecaster;
use crate::logging::{event_names, Stage};
use crate::publisher::{SnapshotPublisher, Subscription};
use crate::regime::{MarkovRegimeModel, Regime};
use crate::snapshot::{Snapshot, SnapshotInputs};
use crate::window::ObservationHistory;

/// Counters describing engine activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub accepted_observations: u64,
    pub rejected_observations: u64,
    pub snapshots_published: u64,
    pub regime_transitions: u64,
    pub subscribers: usize,
}

#[derive(Debug)]
struct EngineState {
    history: ObservationHistory,
    regime: MarkovRegimeModel,
    rng: StdRng,
    /// Accepted observations so far; orders published snapshots.
    sequence: u64,
}

#[derive(Debug)]
pub struct Engine {
    state: Mutex<EngineState>,
    estimator: RateEstimator,
    forecaster: Forecaster,
    publisher: SnapshotPublisher,
    accepted: AtomicU64,
    rejected: AtomicU64,
    published: AtomicU64,
}

impl Engine {
    /// Build an engine from a config. The config is validated first; windows
    /// start empty (see [`Engine::seed_history`]).
    pub fn new(config: &EngineConfig) -> Result<Self> {
        validate_engine_config(config).map_err(ConfigError::from)?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            state: Mutex::new(EngineState {
                history: ObservationHistory::new(config.window.capacity),
                regime: MarkovRegimeModel::from_config(&config.regimes)?,
                rng,
                sequence: 0,
            }),
            estimator: RateEstimator::new(config.prior.clone(), config.density.clone()),
            forecaster: Forecaster::from_config(&config.forecast),
            publisher: SnapshotPublisher::new(config.publisher.mailbox_capacity),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            published: AtomicU64::new(0),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        // Every critical section leaves the state consistent, so a panic in
        // another holder does not invalidate it.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ingest one count.
    ///
    /// Counts must be in `1..=u32::MAX`. An accepted count is appended to both
    /// windows, the regime advances once, and the resulting snapshot is
    /// published and returned. A rejected count changes nothing and publishes
    /// nothing.
    pub fn submit_observation(&self, count: i64) -> Result<Arc<Snapshot>> {
        let value = match u32::try_from(count) {
            Ok(v) if v > 0 => v,
            _ => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    target: event_names::OBSERVATION_REJECTED,
                    stage = %Stage::Ingest,
                    count,
                    "Rejected observation: counts must be positive"
                );
                return Err(EngineError::InvalidObservation { count });
            }
        };

        let inputs = {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            state.history.record(value);
            let from = state.regime.current_index();
            let to = state.regime.advance(&mut state.rng);
            state.sequence += 1;
            tracing::debug!(
                target: event_names::REGIME_TRANSITION,
                stage = %Stage::Infer,
                from = from as u64,
                to = to as u64,
                rate = u64::from(state.regime.current().rate),
                "Regime transition"
            );
            self.capture(state)
        };

        self.accepted.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            target: event_names::OBSERVATION_ACCEPTED,
            stage = %Stage::Ingest,
            count = u64::from(value),
            sequence = inputs.sequence,
            window_len = inputs.region_counts.len() as u64,
            "Accepted observation"
        );

        Ok(self.publish(inputs))
    }

    /// Publish a snapshot of the current state without changing it.
    pub fn request_snapshot(&self) -> Arc<Snapshot> {
        let inputs = {
            let mut guard = self.lock_state();
            self.capture(&mut guard)
        };
        self.publish(inputs)
    }

    pub fn subscribe(&self) -> Subscription {
        self.publisher.subscribe()
    }

    /// Load `count` independent Poisson(`lambda`) draws into each window.
    ///
    /// Zeros are kept. The regime does not move and nothing is published.
    pub fn seed_history(&self, count: usize, lambda: f64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if lambda > MAX_SEED_LAMBDA {
            return Err(EngineError::InvalidParameters(format!(
                "seed lambda {} exceeds {}",
                lambda, MAX_SEED_LAMBDA
            )));
        }
        let poisson = Poisson::new(lambda).map_err(|e| {
            EngineError::InvalidParameters(format!("seed lambda {}: {}", lambda, e))
        })?;

        let mut guard = self.lock_state();
        let state = &mut *guard;
        let mut draw = || -> Result<u32> {
            let value: f64 = poisson.sample(&mut state.rng);
            u32::try_from(value as u64).map_err(|_| {
                EngineError::InvalidParameters(format!("seed draw {} exceeds u32", value))
            })
        };
        let region = (0..count).map(|_| draw()).collect::<Result<Vec<u32>>>()?;
        let observed = (0..count).map(|_| draw()).collect::<Result<Vec<u32>>>()?;
        state.history.seed(region, observed);

        tracing::debug!(
            target: event_names::HISTORY_SEEDED,
            stage = %Stage::Init,
            count = count as u64,
            lambda,
            "Seeded observation history"
        );
        Ok(())
    }

    pub fn stats(&self) -> EngineStats {
        let regime_transitions = self.lock_state().regime.transitions();
        EngineStats {
            accepted_observations: self.accepted.load(Ordering::Relaxed),
            rejected_observations: self.rejected.load(Ordering::Relaxed),
            snapshots_published: self.published.load(Ordering::Relaxed),
            regime_transitions,
            subscribers: self.publisher.subscriber_count(),
        }
    }

    /// The regime the engine is currently in.
    pub fn current_regime(&self) -> Regime {
        self.lock_state().regime.current().clone()
    }

    pub fn forecaster(&self) -> &Forecaster {
        &self.forecaster
    }

    pub fn estimator(&self) -> &RateEstimator {
        &self.estimator
    }

    /// Copy out everything snapshot assembly needs. Draws the forecast,
    /// which advances the RNG but nothing else.
    fn capture(&self, state: &mut EngineState) -> SnapshotInputs {
        let region_counts = state.history.region_counts().contents();
        let forecast = self.forecaster.forecast(&region_counts, &mut state.rng);
        SnapshotInputs {
            observed_meteors: state.history.observed_meteors().contents(),
            region_counts,
            markov_data: state.regime.snapshot(),
            forecast,
            sequence: state.sequence,
        }
    }

    fn publish(&self, inputs: SnapshotInputs) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::assemble(inputs, &self.estimator));

        for warning in &snapshot.warnings {
            tracing::warn!(
                target: event_names::COMPUTE_WARNING,
                stage = %Stage::Forecast,
                source = %warning.source,
                non_finite = warning.non_finite_values as u64,
                "{}",
                warning.message
            );
        }

        let report = self.publisher.publish(Arc::clone(&snapshot));
        if !report.stale {
            self.published.fetch_add(1, Ordering::Relaxed);
        }
        if report.lagged > 0 {
            tracing::debug!(
                target: event_names::SUBSCRIBER_LAGGED,
                stage = %Stage::Publish,
                lagged = report.lagged as u64,
                "Subscribers dropped their oldest snapshot"
            );
        }
        tracing::debug!(
            target: event_names::SNAPSHOT_PUBLISHED,
            stage = %Stage::Publish,
            sequence = snapshot.sequence,
            delivered = report.delivered as u64,
            pruned = report.pruned as u64,
            stale = report.stale,
            "Published snapshot"
        );

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_engine(seed: u64) -> Engine {
        let config = EngineConfig {
            rng_seed: Some(seed),
            ..EngineConfig::default()
        };
        Engine::new(&config).unwrap()
    }

    #[test]
    fn first_observation_scenario() {
        let engine = seeded_engine(1);
        let snap = engine.submit_observation(3).unwrap();
        assert_eq!(snap.region_counts, vec![3]);
        assert_eq!(snap.posterior.alpha, 5.0);
        assert_eq!(snap.posterior.beta, 2.0);
        assert!(snap.predictions.is_none());
        assert!(snap.markov_data.current_index <= 2);
        assert_eq!(snap.markov_data.states, vec!["low", "medium", "high"]);
    }

    #[test]
    fn zero_and_negative_are_rejected_without_side_effects() {
        let engine = seeded_engine(2);
        let sub = engine.subscribe();
        for bad in [0, -4, i64::from(u32::MAX) + 1] {
            let err = engine.submit_observation(bad).unwrap_err();
            assert!(matches!(err, EngineError::InvalidObservation { count } if count == bad));
        }
        let stats = engine.stats();
        assert_eq!(stats.rejected_observations, 3);
        assert_eq!(stats.accepted_observations, 0);
        assert_eq!(stats.snapshots_published, 0);
        assert_eq!(stats.regime_transitions, 0);
        assert!(sub.try_recv().is_err());
        assert!(engine.request_snapshot().region_counts.is_empty());
    }

    #[test]
    fn ten_twos_give_flat_forecast() {
        let engine = seeded_engine(3);
        let mut last = None;
        for _ in 0..10 {
            last = Some(engine.submit_observation(2).unwrap());
        }
        let snap = last.unwrap();
        let predictions = snap.predictions.as_ref().unwrap();
        assert_eq!(predictions, &vec![2.0; 10]);
        assert_eq!(snap.lower_bound.as_ref(), Some(predictions));
        assert_eq!(snap.upper_bound.as_ref(), Some(predictions));
    }

    #[test]
    fn refresh_does_not_mutate() {
        let engine = seeded_engine(4);
        engine.submit_observation(5).unwrap();
        engine.submit_observation(1).unwrap();
        let a = engine.request_snapshot();
        let b = engine.request_snapshot();
        assert_eq!(a.region_counts, b.region_counts);
        assert_eq!(a.markov_data, b.markov_data);
        assert_eq!(engine.stats().regime_transitions, 2);
    }

    #[test]
    fn stats_track_activity() {
        let engine = seeded_engine(5);
        let _sub = engine.subscribe();
        engine.submit_observation(1).unwrap();
        engine.submit_observation(2).unwrap();
        let _ = engine.submit_observation(0);
        engine.request_snapshot();
        let stats = engine.stats();
        assert_eq!(stats.accepted_observations, 2);
        assert_eq!(stats.rejected_observations, 1);
        assert_eq!(stats.snapshots_published, 3);
        assert_eq!(stats.regime_transitions, 2);
        assert_eq!(stats.subscribers, 1);
    }

    #[test]
    fn seed_history_fills_windows_independently() {
        let engine = seeded_engine(6);
        engine.seed_history(10, 2.0).unwrap();
        let snap = engine.request_snapshot();
        assert_eq!(snap.region_counts.len(), 10);
        assert_eq!(snap.posterior.beta, 11.0);
        assert_eq!(engine.stats().regime_transitions, 0);
        assert_eq!(snap.markov_data.current_index, 1);
        assert!(snap.predictions.is_some());
    }

    #[test]
    fn seed_history_rejects_bad_lambda() {
        let engine = seeded_engine(7);
        assert!(engine.seed_history(5, 0.0).is_err());
        assert!(engine.seed_history(0, -1.0).is_ok());
        let err = engine.seed_history(5, 1.0e12).unwrap_err();
        assert_eq!(err.code(), 11);
        assert!(engine.request_snapshot().region_counts.is_empty());
    }

    #[test]
    fn same_seed_same_stream() {
        let a = seeded_engine(99);
        let b = seeded_engine(99);
        for count in [3, 1, 4, 1, 5, 9, 2, 6] {
            let sa = a.submit_observation(count).unwrap();
            let sb = b.submit_observation(count).unwrap();
            assert_eq!(sa.markov_data, sb.markov_data);
            assert_eq!(sa.predictions, sb.predictions);
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.window.capacity = 0;
        let err = Engine::new(&config).unwrap_err();
        assert_eq!(err.code(), 10);
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
