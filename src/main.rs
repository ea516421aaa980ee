use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use vigil::config::AppConfig;
use vigil::{report, App, Scheduler};
use vigil_core::{RunRequest, SensorStatus};

/// vigil - pluggable health checks with thresholds, caching and history
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0", global = true)]
    debug: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate sensors once (all enabled sensors when none are named)
    Run {
        #[arg(value_name = "SENSOR")]
        names: Vec<String>,
        /// Ignore cached results
        #[arg(short, long)]
        force: bool,
        /// Include verbose output of sensors that provide it
        #[arg(short, long)]
        verbose: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate all enabled sensors periodically until interrupted
    Watch {
        /// Seconds between batches
        #[arg(short, long, default_value = "60")]
        interval: u64,
    },
    /// Drop cached results (all when no sensor is named)
    ResetCache {
        #[arg(value_name = "SENSOR")]
        names: Vec<String>,
    },
    /// List configured sensors and available sensor types
    List,
    /// Show logged results of a sensor
    History {
        #[arg(value_name = "SENSOR")]
        name: String,
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Write the default configuration
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    info!("Starting vigil v{}", env!("CARGO_PKG_VERSION"));

    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<ExitCode> {
    let Cli { config, command, .. } = cli;

    match command {
        Command::Init { force } => return init(config, force),
        Command::Run {
            names,
            force,
            verbose,
            json,
        } => {
            let app = open_app(config.as_deref())?;
            let request = RunRequest { force, verbose };
            let batch = app.runner().run_sensors(&names, request)?;
            if json {
                println!("{}", report::to_json(&batch, app.catalog())?);
            } else {
                print!("{}", report::to_text(&batch, app.catalog()));
            }
            if batch.worst_status() == SensorStatus::Critical {
                return Ok(ExitCode::from(2));
            }
        }
        Command::Watch { interval } => {
            let app = open_app(config.as_deref())?;
            watch(&app, Duration::from_secs(interval.max(1)))?;
        }
        Command::ResetCache { names } => {
            let app = open_app(config.as_deref())?;
            app.runner().reset_cache(&names)?;
            if names.is_empty() {
                println!("Cleared all cached results");
            } else {
                println!("Cleared cached results of {}", names.join(", "));
            }
        }
        Command::List => list(&open_app(config.as_deref())?),
        Command::History { name, limit } => {
            let app = open_app(config.as_deref())?;
            if app.catalog().get(&name).is_none() {
                warn!("Sensor {} is not configured, showing logged entries anyway", name);
            }
            let entries = app.history().entries_for(&name, limit)?;
            if entries.is_empty() {
                println!("No logged results for {}", name);
            } else {
                print!("{}", report::history_to_text(&entries));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn open_app(config_path: Option<&Path>) -> Result<App> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    vigil_sensors::initialize_sensors();
    App::new(config)
}

fn init(path: Option<PathBuf>, force: bool) -> Result<ExitCode> {
    let path = match path {
        Some(path) => path,
        None => AppConfig::config_path()?,
    };
    if path.exists() && !force {
        eprintln!("{} already exists (use --force to overwrite)", path.display());
        return Ok(ExitCode::FAILURE);
    }
    AppConfig::default()
        .save_to_path(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn list(app: &App) {
    println!("Configured sensors:");
    for entry in app.catalog().entries() {
        let definition = entry.definition();
        println!(
            "  {:<20} {:<14} {:<10} {}{}",
            definition.name,
            definition.sensor_type,
            definition.category,
            definition.display_label(),
            if definition.enabled { "" } else { " (disabled)" }
        );
    }
    println!();
    println!("Available sensor types:");
    for info in app.registry().list_sensor_types() {
        println!("  {:<14} {}", info.id, info.description);
    }
}

fn watch(app: &App, interval: Duration) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let scheduler = Scheduler::new(app.runner().clone(), interval);

    runtime.block_on(scheduler.run(
        |batch| {
            let problems: Vec<_> = batch
                .iter()
                .filter(|result| result.status().is_problem())
                .collect();
            println!("{}", report::summary(&batch));
            for result in problems {
                println!(
                    "  {:<8} {}: {}",
                    result.status().as_str(),
                    result.sensor_name(),
                    result.message()
                );
            }
        },
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        },
    ));
    Ok(())
}
