//! Fuzz target for engine.json parsing and validation.
//!
//! Parsing may fail and validation may reject, but neither may panic, and
//! any config that validates must build an engine.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mw_config::{validate_engine_config, EngineConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(config) = serde_json::from_slice::<EngineConfig>(data) else {
        return;
    };
    if validate_engine_config(&config).is_ok() {
        let engine = mw_core::Engine::new(&config).expect("validated config builds an engine");
        let _ = engine.request_snapshot();
    }
});
