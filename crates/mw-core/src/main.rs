//! Meteorwatch Core - streaming meteor-rate inference
//!
//! The main entry point for mw-core, handling:
//! - Ingesting observation streams and printing snapshots as JSONL
//! - Driving the engine from the synthetic Poisson source
//! - Chart data for offline reporting
//! - Config inspection and validation

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use mw_config::{
    load_config, read_config_file, validate_engine_config, ConfigError, EngineConfig,
    LoadedConfig, CONFIG_SCHEMA_VERSION,
};
use mw_core::exit_codes::ExitCode;
use mw_core::logging::{
    event_names, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use mw_core::report::ChartReport;
use mw_core::simulate::ObservationSimulator;
use mw_core::{Engine, EngineError, EngineStats};

/// Meteorwatch Core - Bayesian meteor-rate inference over a stream of counts
#[derive(Parser)]
#[command(name = "mw-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Engine config file (JSON); overrides METEORWATCH_CONFIG and the
    /// config directories
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error, off
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr: human or jsonl
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Seed for the engine and simulator RNGs (overrides config rng_seed)
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest counts (one per line) and print each snapshot as JSONL
    Run(RunArgs),
    /// Drive the engine with synthetic Poisson counts
    Simulate(SimulateArgs),
    /// Print one refreshed snapshot as JSON
    Snapshot,
    /// Simulate, then print chart data as JSON
    Report(ReportArgs),
    /// Configuration management
    Config(ConfigArgs),
    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Read counts from FILE instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Start from empty windows even if the config seeds history
    #[arg(long)]
    no_seed_history: bool,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Number of cycles (one count per cycle)
    #[arg(long, default_value_t = 50)]
    cycles: usize,

    /// Request a refresh after every K cycles
    #[arg(long)]
    refresh_every: Option<usize>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Cycles to simulate before building the report
    #[arg(long, default_value_t = 50)]
    cycles: usize,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the resolved configuration and where it came from
    Show,
    /// Validate a config file (or the resolved one)
    Validate {
        /// File to validate
        path: Option<PathBuf>,
    },
    /// Print the built-in default configuration
    Default,
}

/// Keyword that requests a snapshot without ingesting anything.
const REFRESH_KEYWORD: &str = "refresh";

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format);
    init_logging(&log_config);

    let ctx = LogContext::for_process();
    let span = ctx.span();
    let _run = span.enter();

    tracing::debug!(
        target: event_names::RUN_STARTED,
        stage = %Stage::Init,
        command = ?cli.command,
        "Starting mw-core"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_stream(&cli.global, args),
        Commands::Simulate(args) => run_simulate(&cli.global, args),
        Commands::Snapshot => run_snapshot(&cli.global),
        Commands::Report(args) => run_report(&cli.global, args),
        Commands::Config(args) => run_config(&cli.global, args),
        Commands::Version => print_version(),
    };

    let exit_code = match result {
        Ok(()) => ExitCode::Clean,
        Err(err) => output_error(&err),
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Engine setup
// ============================================================================

/// Load config (CLI → env → XDG → /etc → defaults), apply `--seed`, and build
/// the engine.
fn build_engine(global: &GlobalOpts) -> Result<(Engine, EngineConfig), EngineError> {
    let loaded = load_config(global.config.as_deref())?;
    log_config_source(&loaded);

    let mut config = loaded.config;
    if global.seed.is_some() {
        config.rng_seed = global.seed;
    }

    let engine = Engine::new(&config)?;
    Ok((engine, config))
}

fn log_config_source(loaded: &LoadedConfig) {
    if loaded.is_default() {
        tracing::info!(
            target: event_names::CONFIG_DEFAULT_USED,
            stage = %Stage::Init,
            "No config file found; using built-in defaults"
        );
    } else {
        tracing::info!(
            target: event_names::CONFIG_LOADED,
            stage = %Stage::Init,
            source = %loaded.resolved.source,
            path = ?loaded.snapshot.path,
            content_hash = ?loaded.snapshot.content_hash,
            "Loaded engine config"
        );
    }
}

fn seed_history(engine: &Engine, config: &EngineConfig) -> Result<(), EngineError> {
    let seed = &config.seed_history;
    engine.seed_history(seed.count, seed.lambda)
}

fn log_stats(stats: &EngineStats) {
    tracing::info!(
        target: event_names::RUN_FINISHED,
        stage = %Stage::Publish,
        accepted = stats.accepted_observations,
        rejected = stats.rejected_observations,
        published = stats.snapshots_published,
        transitions = stats.regime_transitions,
        "Run finished"
    );
}

// ============================================================================
// Commands
// ============================================================================

fn run_stream(global: &GlobalOpts, args: &RunArgs) -> Result<(), EngineError> {
    let (engine, config) = build_engine(global)?;
    if !args.no_seed_history {
        seed_history(&engine, &config)?;
    }

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(std::fs::File::open(path)?)),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let snapshot = if trimmed == REFRESH_KEYWORD {
            engine.request_snapshot()
        } else {
            let count = parse_count(idx + 1, trimmed)?;
            match engine.submit_observation(count) {
                Ok(snapshot) => snapshot,
                // Already logged and counted by the engine.
                Err(err) if err.is_recoverable() => continue,
                Err(err) => return Err(err),
            }
        };
        writeln!(out, "{}", snapshot.to_jsonl()?)?;
    }
    out.flush()?;

    log_stats(&engine.stats());
    Ok(())
}

fn parse_count(line: usize, input: &str) -> Result<i64, EngineError> {
    input.parse::<i64>().map_err(|_| {
        tracing::error!(
            target: event_names::INPUT_PARSE_ERROR,
            stage = %Stage::Ingest,
            line = line as u64,
            input,
            "Input line is not an integer count"
        );
        EngineError::ParseObservation {
            line,
            input: input.to_string(),
        }
    })
}

fn run_simulate(global: &GlobalOpts, args: &SimulateArgs) -> Result<(), EngineError> {
    let (engine, config) = build_engine(global)?;
    seed_history(&engine, &config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut simulator = ObservationSimulator::new(config.rng_seed);
    let summary = simulator.run(&engine, args.cycles, args.refresh_every, |snapshot| {
        writeln!(out, "{}", snapshot.to_jsonl()?)?;
        Ok(())
    })?;
    out.flush()?;

    tracing::debug!(
        target: event_names::RUN_FINISHED,
        stage = %Stage::Ingest,
        cycles = summary.cycles as u64,
        accepted = summary.accepted as u64,
        rejected = summary.rejected as u64,
        refreshes = summary.refreshes as u64,
        "Simulation finished"
    );
    log_stats(&engine.stats());
    Ok(())
}

fn run_snapshot(global: &GlobalOpts) -> Result<(), EngineError> {
    let (engine, config) = build_engine(global)?;
    seed_history(&engine, &config)?;

    let snapshot = engine.request_snapshot();
    println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
    Ok(())
}

fn run_report(global: &GlobalOpts, args: &ReportArgs) -> Result<(), EngineError> {
    let (engine, config) = build_engine(global)?;
    seed_history(&engine, &config)?;

    let mut simulator = ObservationSimulator::new(config.rng_seed);
    simulator.run(&engine, args.cycles, None, |_| Ok(()))?;

    let snapshot = engine.request_snapshot();
    let report = ChartReport::build(&snapshot, engine.forecaster());
    println!("{}", report.to_json_pretty()?);
    log_stats(&engine.stats());
    Ok(())
}

fn run_config(global: &GlobalOpts, args: &ConfigArgs) -> Result<(), EngineError> {
    match &args.command {
        ConfigCommands::Show => {
            let loaded = load_config(global.config.as_deref())?;
            log_config_source(&loaded);
            let response = serde_json::json!({
                "schema_version": CONFIG_SCHEMA_VERSION,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "snapshot": loaded.snapshot,
                "config": loaded.config,
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        ConfigCommands::Validate { path } => {
            let path = path.as_deref().or(global.config.as_deref());
            run_config_validate(global, path)
        }
        ConfigCommands::Default => {
            println!("{}", serde_json::to_string_pretty(&EngineConfig::default())?);
            Ok(())
        }
    }
}

fn run_config_validate(global: &GlobalOpts, path: Option<&Path>) -> Result<(), EngineError> {
    let (source, hash) = match path {
        Some(path) => {
            let (config, raw) = read_config_file(path)?;
            validate_engine_config(&config).map_err(ConfigError::from)?;
            (
                path.display().to_string(),
                Some(mw_config::snapshot::hash_content(&raw)),
            )
        }
        None => {
            let loaded = load_config(global.config.as_deref())?;
            let source = loaded
                .snapshot
                .path
                .clone()
                .unwrap_or_else(|| loaded.snapshot.source.clone());
            (source, loaded.snapshot.content_hash)
        }
    };

    let response = serde_json::json!({
        "schema_version": CONFIG_SCHEMA_VERSION,
        "status": "valid",
        "source": source,
        "content_hash": hash,
    });
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn print_version() -> Result<(), EngineError> {
    let version_info = serde_json::json!({
        "mw_core_version": env!("CARGO_PKG_VERSION"),
        "config_schema_version": CONFIG_SCHEMA_VERSION,
        "rust_version": env!("CARGO_PKG_RUST_VERSION"),
    });
    println!("{}", serde_json::to_string_pretty(&version_info)?);
    Ok(())
}

// ============================================================================
// Error output
// ============================================================================

/// Report an error on stderr (JSON) and pick the exit code.
fn output_error(error: &EngineError) -> ExitCode {
    let exit_code = ExitCode::from(error);

    match error {
        EngineError::Config(_) | EngineError::InvalidParameters(_) => tracing::error!(
            target: event_names::CONFIG_ERROR,
            stage = %Stage::Init,
            code = error.code(),
            exit_code = exit_code.as_i32(),
            "{}",
            error
        ),
        // Logged where the line was read.
        EngineError::ParseObservation { .. } => {}
        _ => tracing::error!(
            target: event_names::INTERNAL_ERROR,
            code = error.code(),
            category = %error.category(),
            exit_code = exit_code.as_i32(),
            "{}",
            error
        ),
    }

    let response = serde_json::json!({
        "status": "error",
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "error": {
            "code": error.code(),
            "category": error.category(),
            "exit_code": exit_code.code_name(),
            "message": error.to_string(),
        }
    });
    eprintln!(
        "{}",
        serde_json::to_string_pretty(&response).unwrap_or_else(|_| error.to_string())
    );

    exit_code
}
