//! End-to-end CLI tests for mw-core.
//!
//! Each command runs with an isolated config environment so a developer's
//! own `~/.config/meteorwatch` cannot leak in.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Get a Command for the mw-core binary with config lookup pinned to `home`.
fn mw_core(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mw-core").expect("mw-core binary should exist");
    cmd.env_remove("METEORWATCH_CONFIG")
        .env("METEORWATCH_CONFIG_DIR", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("RUST_LOG")
        .env("MW_LOG", "warn");
    cmd
}

fn jsonl(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line is JSON"))
        .collect()
}

const VALID_CONFIG: &str = r#"{
    "schema_version": "1.0.0",
    "window": { "capacity": 4 },
    "seed_history": { "count": 0, "lambda": 2.0 }
}"#;

// ============================================================================
// Informational commands
// ============================================================================

mod info {
    use super::*;

    #[test]
    fn version_prints_json() {
        let home = TempDir::new().unwrap();
        let output = mw_core(&home).arg("version").assert().success();
        let json: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
        assert_eq!(json["config_schema_version"], "1.0.0");
        assert!(json["mw_core_version"].is_string());
    }

    #[test]
    fn config_default_round_trips_into_engine_config() {
        let home = TempDir::new().unwrap();
        let output = mw_core(&home).args(["config", "default"]).assert().success();
        let config: mw_config::EngineConfig =
            serde_json::from_slice(&output.get_output().stdout).unwrap();
        assert_eq!(config, mw_config::EngineConfig::default());
    }

    #[test]
    fn config_show_reports_builtin_default() {
        let home = TempDir::new().unwrap();
        let output = mw_core(&home).args(["config", "show"]).assert().success();
        let json: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
        assert_eq!(json["snapshot"]["source"], "builtin default");
        assert!(json["snapshot"]["content_hash"].is_null());
        assert_eq!(json["config"]["window"]["capacity"], 100);
    }

    #[test]
    fn config_show_finds_file_in_config_dir() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join("engine.json"), VALID_CONFIG).unwrap();
        let output = mw_core(&home).args(["config", "show"]).assert().success();
        let json: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
        assert_eq!(json["snapshot"]["source"], "environment variable");
        assert!(json["snapshot"]["content_hash"].is_string());
        assert_eq!(json["config"]["window"]["capacity"], 4);
    }
}

// ============================================================================
// Config validation
// ============================================================================

mod config_validate {
    use super::*;

    #[test]
    fn valid_file_passes() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("candidate.json");
        std::fs::write(&path, VALID_CONFIG).unwrap();
        mw_core(&home)
            .args(["config", "validate"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"valid\""));
    }

    #[test]
    fn non_stochastic_row_fails_with_config_exit() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"regimes": {"transition_matrix": [[0.5,0.5,0.5],[0.2,0.5,0.3],[0.1,0.3,0.6]]}}"#,
        )
        .unwrap();
        mw_core(&home)
            .args(["config", "validate"])
            .arg(&path)
            .assert()
            .code(11)
            .stderr(predicate::str::contains("Row 0"));
    }

    #[test]
    fn malformed_json_fails_with_config_exit() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        mw_core(&home)
            .args(["config", "validate"])
            .arg(&path)
            .assert()
            .code(11)
            .stderr(predicate::str::contains("ERR_CONFIG"));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let home = TempDir::new().unwrap();
        mw_core(&home)
            .arg("--config")
            .arg(home.path().join("nope.json"))
            .arg("snapshot")
            .assert()
            .code(11);
    }
}

// ============================================================================
// Streaming
// ============================================================================

mod run {
    use super::*;

    #[test]
    fn stdin_stream_prints_one_snapshot_per_accepted_line() {
        let home = TempDir::new().unwrap();
        let output = mw_core(&home)
            .args(["--seed", "1", "run", "--no-seed-history"])
            .write_stdin("3\n\n# comment\n0\nrefresh\n2\n")
            .assert()
            .success();
        let lines = jsonl(&output.get_output().stdout);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["region_counts"], serde_json::json!([3]));
        assert!(lines[0]["predictions"].is_null());
        assert_eq!(lines[0]["posterior"]["alpha"], 5.0);
        assert_eq!(lines[1]["region_counts"], serde_json::json!([3]));
        assert_eq!(lines[2]["region_counts"], serde_json::json!([3, 2]));
        assert_eq!(lines[2]["predictions"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn seeded_history_precedes_input() {
        let home = TempDir::new().unwrap();
        let output = mw_core(&home)
            .args(["--seed", "2", "run"])
            .write_stdin("5\n")
            .assert()
            .success();
        let lines = jsonl(&output.get_output().stdout);
        assert_eq!(lines.len(), 1);
        let counts = lines[0]["region_counts"].as_array().unwrap();
        assert_eq!(counts.len(), 11);
        assert_eq!(counts[10], 5);
    }

    #[test]
    fn input_file_is_read() {
        let home = TempDir::new().unwrap();
        let input = home.path().join("counts.txt");
        std::fs::write(&input, "1\n2\n3\n").unwrap();
        let output = mw_core(&home)
            .args(["run", "--no-seed-history", "--input"])
            .arg(&input)
            .assert()
            .success();
        let lines = jsonl(&output.get_output().stdout);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2]["region_counts"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn non_numeric_line_fails_with_args_exit() {
        let home = TempDir::new().unwrap();
        mw_core(&home)
            .args(["run", "--no-seed-history"])
            .write_stdin("2\nthree\n4\n")
            .assert()
            .code(10)
            .stderr(predicate::str::contains("line 2"));
    }

    #[test]
    fn missing_input_file_fails_with_io_exit() {
        let home = TempDir::new().unwrap();
        mw_core(&home)
            .args(["run", "--input"])
            .arg(home.path().join("absent.txt"))
            .assert()
            .code(21);
    }
}

// ============================================================================
// Simulation and reporting
// ============================================================================

mod simulate {
    use super::*;

    fn run_sim(seed: &str) -> Vec<Value> {
        let home = TempDir::new().unwrap();
        let output = mw_core(&home)
            .args(["--seed", seed, "simulate", "--cycles", "25", "--refresh-every", "5"])
            .assert()
            .success();
        jsonl(&output.get_output().stdout)
    }

    #[test]
    fn seeded_simulation_is_reproducible() {
        let a = run_sim("9");
        let b = run_sim("9");
        assert_eq!(a.len(), b.len());
        assert!(a.len() >= 5);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x["region_counts"], y["region_counts"]);
            assert_eq!(x["markov_data"], y["markov_data"]);
            assert_eq!(x["predictions"], y["predictions"]);
        }
    }

    #[test]
    fn snapshot_command_prints_seeded_state() {
        let home = TempDir::new().unwrap();
        let output = mw_core(&home)
            .args(["--seed", "3", "snapshot"])
            .assert()
            .success();
        let json: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
        assert_eq!(json["region_counts"].as_array().unwrap().len(), 10);
        assert_eq!(json["markov_data"]["current_index"], 1);
        assert_eq!(json["predictions"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn report_contains_all_charts() {
        let home = TempDir::new().unwrap();
        let output = mw_core(&home)
            .args(["--seed", "4", "report", "--cycles", "30"])
            .assert()
            .success();
        let json: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
        assert_eq!(json["markov"]["title"], "Markov Chain: Meteor Arrival Rates");
        assert_eq!(json["markov"]["bars"].as_array().unwrap().len(), 3);
        assert_eq!(
            json["time_series"]["band"]["label"],
            "95% Confidence Interval"
        );
        assert!(json["posterior"]["curve"]["label"]
            .as_str()
            .unwrap()
            .starts_with("Posterior α="));
        assert_eq!(json["distribution"]["boxes"].as_array().unwrap().len(), 2);
    }
}

// ============================================================================
// Argument errors
// ============================================================================

mod invalid_args {
    use super::*;

    #[test]
    fn unknown_command_fails() {
        let home = TempDir::new().unwrap();
        mw_core(&home)
            .arg("nonexistent-command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn bad_log_level_fails() {
        let home = TempDir::new().unwrap();
        mw_core(&home)
            .args(["--log-level", "loud", "version"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown log level"));
    }
}
