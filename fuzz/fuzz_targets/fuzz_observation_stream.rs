//! Fuzz target for arbitrary observation streams.
//!
//! Any mix of counts and refreshes must keep the window bounded and the
//! posterior consistent with it.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mw_config::EngineConfig;
use mw_core::Engine;

#[derive(Debug, Arbitrary)]
enum Step {
    Submit(i64),
    Refresh,
}

#[derive(Debug, Arbitrary)]
struct Input {
    seed: u64,
    capacity: u8,
    steps: Vec<Step>,
}

fuzz_target!(|input: Input| {
    let mut config = EngineConfig {
        rng_seed: Some(input.seed),
        ..EngineConfig::default()
    };
    config.window.capacity = usize::from(input.capacity).max(1);
    let engine = Engine::new(&config).expect("default-derived config is valid");

    for step in input.steps.iter().take(512) {
        let snapshot = match step {
            Step::Submit(count) => match engine.submit_observation(*count) {
                Ok(snapshot) => snapshot,
                Err(_) => continue,
            },
            Step::Refresh => engine.request_snapshot(),
        };
        assert!(snapshot.region_counts.len() <= config.window.capacity);
        assert_eq!(
            snapshot.posterior.beta,
            1.0 + snapshot.region_counts.len() as f64
        );
        assert!(snapshot.markov_data.current_index < 3);
    }
});
