use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gmti_config::{
    ConfigLoader, ConsoleConfig, EngineEndpoints,
    constants::MIN_POLL_INTERVAL_MS,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;
mod session;

#[derive(Parser)]
#[command(
    name = "gmtictl",
    version,
    about = "Drive the GMTI simulator engine and stream its telemetry"
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,
    #[command(subcommand)]
    command: Command,
}

/// Where console settings come from. Accepted before or after the
/// subcommand.
#[derive(Args)]
struct Settings {
    /// Console settings file (TOML). Defaults to $GMTI_CONFIG_PATH, then
    /// ./gmti-console.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Environment file folded in before reading GMTI_* variables
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    /// Engine base URL, e.g. http://127.0.0.1:9000
    #[arg(long, global = true)]
    engine_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// List scenario descriptors under <root>/simulator/configs
    Scenarios {
        #[arg(long)]
        root: Option<PathBuf>,
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse one descriptor file against the built-in defaults
    Show {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Launch the engine, submit a scenario and stream telemetry
    Run {
        #[arg(long)]
        root: Option<PathBuf>,
        /// Scenario name or file name to load before submitting
        #[arg(long)]
        scenario: Option<String>,
        #[command(flatten)]
        tuning: session::Tuning,
        /// Stop after this many telemetry snapshots (0 = until Ctrl-C)
        #[arg(long, default_value_t = 10)]
        ticks: u64,
        /// Telemetry poll period in milliseconds
        #[arg(long, value_parser = poll_interval_ms())]
        interval_ms: Option<u64>,
        /// Submit this long after launch instead of on the first snapshot
        #[arg(long)]
        submit_delay_ms: Option<u64>,
        /// Sparkline width in columns
        #[arg(long, default_value_t = 64)]
        width: usize,
    },
    /// Poll an engine that is already running
    Watch {
        #[arg(long, default_value_t = 10)]
        ticks: u64,
        #[arg(long, value_parser = poll_interval_ms())]
        interval_ms: Option<u64>,
        #[arg(long, default_value_t = 64)]
        width: usize,
    },
    /// Send one run configuration to a running engine
    Submit {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        scenario: Option<String>,
        #[command(flatten)]
        tuning: session::Tuning,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scenarios { root, json } => {
            let config = load_config(&cli.settings)?;
            let root = resolve_root(root, &config)?;
            output::print_catalog(&root, json)
        }
        Command::Show { file, json } => output::print_descriptor(&file, json),
        Command::Run {
            root,
            scenario,
            tuning,
            ticks,
            interval_ms,
            submit_delay_ms,
            width,
        } => {
            let mut config = load_config(&cli.settings)?;
            config.workspace_root = Some(resolve_root(root, &config)?);
            if let Some(ms) = interval_ms {
                config.poll_interval = std::time::Duration::from_millis(ms);
            }
            session::run(
                config,
                session::RunOptions {
                    scenario,
                    parameters: tuning.parameters(),
                    ticks,
                    submit_delay_ms,
                    width,
                },
            )
            .await
        }
        Command::Watch {
            ticks,
            interval_ms,
            width,
        } => {
            let config = load_config(&cli.settings)?;
            session::watch(config, ticks, interval_ms, width).await
        }
        Command::Submit {
            root,
            scenario,
            tuning,
        } => {
            let config = load_config(&cli.settings)?;
            let root = match scenario {
                Some(_) => Some(resolve_root(root, &config)?),
                None => None,
            };
            session::submit(config, root, scenario, tuning.parameters()).await
        }
    }
}

fn poll_interval_ms() -> clap::builder::RangedU64ValueParser<u64> {
    clap::value_parser!(u64).range(MIN_POLL_INTERVAL_MS..)
}

fn load_config(settings: &Settings) -> Result<ConsoleConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &settings.config {
        loader = loader.with_config_path(path);
    }
    if let Some(env_file) = &settings.env_file {
        loader = loader.with_env_file(env_file);
    }
    let load = loader.load().context("failed to load console settings")?;
    load.warnings.log();

    let mut config = load.config;
    if let Some(raw) = &settings.engine_url {
        config.endpoints = EngineEndpoints::parse(raw)
            .with_context(|| format!("invalid --engine-url '{raw}'"))?;
    }
    Ok(config)
}

/// `--root`, then the configured workspace, then the working directory.
fn resolve_root(
    flag: Option<PathBuf>,
    config: &ConsoleConfig,
) -> Result<PathBuf> {
    match flag.or_else(|| config.workspace_root.clone()) {
        Some(root) => Ok(root),
        None => std::env::current_dir()
            .context("failed to resolve the current directory"),
    }
}
