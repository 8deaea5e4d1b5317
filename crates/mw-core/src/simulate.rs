//! Synthetic observation source.
//!
//! Counts are drawn from Poisson(rate of the engine's current regime), so the
//! regime model modulates the stream it is fed. Zero draws are submitted like
//! any other count and the engine rejects them.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::Result;
use crate::snapshot::Snapshot;

/// Offset applied to the engine seed so the simulator does not replay the
/// engine's own random stream.
const SIMULATOR_SEED_OFFSET: u64 = 0x5eed;

/// Totals from one [`ObservationSimulator::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub cycles: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub refreshes: usize,
}

#[derive(Debug)]
pub struct ObservationSimulator {
    rng: StdRng,
}

impl ObservationSimulator {
    /// Seeded simulator. The same seed gives the same draws for the same
    /// sequence of rates.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(SIMULATOR_SEED_OFFSET)),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    /// One Poisson draw at `rate`. A zero rate always yields zero.
    ///
    /// Draws are not clamped to `u32`; the engine rejects counts it cannot
    /// store.
    pub fn draw(&mut self, rate: u32) -> u64 {
        match Poisson::new(f64::from(rate)) {
            Ok(poisson) => {
                let draw: f64 = poisson.sample(&mut self.rng);
                draw as u64
            }
            Err(_) => 0,
        }
    }

    /// Draw one count at the engine's current regime rate.
    pub fn next_count(&mut self, engine: &Engine) -> u64 {
        let rate = engine.current_regime().rate;
        self.draw(rate)
    }

    /// Drive `engine` for `cycles` cycles, calling `on_snapshot` for every
    /// published snapshot. With `refresh_every = Some(k)` a refresh is
    /// requested after every `k`th cycle.
    ///
    /// Rejected counts are tallied and skipped; any other engine or callback
    /// error stops the run.
    pub fn run<F>(
        &mut self,
        engine: &Engine,
        cycles: usize,
        refresh_every: Option<usize>,
        mut on_snapshot: F,
    ) -> Result<SimulationSummary>
    where
        F: FnMut(&Snapshot) -> Result<()>,
    {
        let mut summary = SimulationSummary {
            cycles,
            ..SimulationSummary::default()
        };

        for cycle in 1..=cycles {
            let count = self.next_count(engine);
            let count = i64::try_from(count).unwrap_or(i64::MAX);
            match engine.submit_observation(count) {
                Ok(snapshot) => {
                    summary.accepted += 1;
                    on_snapshot(&snapshot)?;
                }
                Err(err) if err.is_recoverable() => summary.rejected += 1,
                Err(err) => return Err(err),
            }

            if let Some(every) = refresh_every.filter(|&k| k > 0) {
                if cycle % every == 0 {
                    let snapshot = engine.request_snapshot();
                    summary.refreshes += 1;
                    on_snapshot(&snapshot)?;
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mw_config::EngineConfig;

    fn engine(seed: u64) -> Engine {
        let config = EngineConfig {
            rng_seed: Some(seed),
            ..EngineConfig::default()
        };
        Engine::new(&config).unwrap()
    }

    #[test]
    fn zero_rate_draws_zero() {
        let mut sim = ObservationSimulator::new(Some(1));
        for _ in 0..10 {
            assert_eq!(sim.draw(0), 0);
        }
    }

    #[test]
    fn draws_track_rate() {
        let mut sim = ObservationSimulator::new(Some(2));
        let n = 5_000;
        let mean_low = (0..n).map(|_| sim.draw(1) as f64).sum::<f64>() / n as f64;
        let mean_high = (0..n).map(|_| sim.draw(7) as f64).sum::<f64>() / n as f64;
        assert!((mean_low - 1.0).abs() < 0.1, "low mean {}", mean_low);
        assert!((mean_high - 7.0).abs() < 0.3, "high mean {}", mean_high);
    }

    #[test]
    fn draws_above_u32_are_not_clamped() {
        let mut sim = ObservationSimulator::new(Some(5));
        let draws: Vec<u64> = (0..200).map(|_| sim.draw(u32::MAX)).collect();
        assert!(draws.iter().any(|&d| d > u64::from(u32::MAX)));
    }

    #[test]
    fn run_accounts_for_every_cycle() {
        let engine = engine(3);
        let mut sim = ObservationSimulator::new(Some(3));
        let mut seen = 0;
        let summary = sim
            .run(&engine, 50, Some(10), |_| {
                seen += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(summary.cycles, 50);
        assert_eq!(summary.accepted + summary.rejected, 50);
        assert_eq!(summary.refreshes, 5);
        assert_eq!(seen, summary.accepted + summary.refreshes);

        let stats = engine.stats();
        assert_eq!(stats.accepted_observations as usize, summary.accepted);
        assert_eq!(stats.rejected_observations as usize, summary.rejected);
    }

    #[test]
    fn same_seed_same_run() {
        let collect = |seed| {
            let engine = engine(seed);
            let mut sim = ObservationSimulator::new(Some(seed));
            let mut counts = Vec::new();
            sim.run(&engine, 30, None, |snap| {
                counts.push(snap.region_counts.clone());
                Ok(())
            })
            .unwrap();
            counts
        };
        assert_eq!(collect(11), collect(11));
    }

    #[test]
    fn callback_error_stops_run() {
        let engine = engine(4);
        let mut sim = ObservationSimulator::new(Some(4));
        let err = sim
            .run(&engine, 100, Some(1), |_| {
                Err(crate::error::EngineError::InvalidParameters("stop".into()))
            })
            .unwrap_err();
        assert_eq!(err.code(), 11);
        assert!(engine.stats().snapshots_published <= 1);
    }
}
