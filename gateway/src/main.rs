mod config;

use clap::{Args, Parser, Subcommand};
use config::{CommonConfig, Config, ConfigError, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const METRICS_PREFIX: &str = "gateway";

#[derive(Parser)]
#[command(name = "gateway", about = "Authenticating API gateway")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Start the gateway and admin listeners
    Run(ConfigArgs),
    /// Parse and validate a config file, then exit
    Validate(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    config_file: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid gateway config: {0}")]
    Validation(#[from] proxy::config::ValidationError),
    #[error("could not install statsd recorder: {0}")]
    Metrics(String),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Proxy(#[from] proxy::ProxyError),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        CliCommand::Run(args) => run(&args),
        CliCommand::Validate(args) => validate(&args),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Gateway exited with error");
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn validate(args: &ConfigArgs) -> Result<(), CliError> {
    let config = Config::from_file(&args.config_file)?;
    config.gateway.validate()?;
    println!(
        "{}: ok ({} routes)",
        args.config_file.display(),
        config.gateway.routes.len()
    );
    Ok(())
}

fn run(args: &ConfigArgs) -> Result<(), CliError> {
    let config = Config::from_file(&args.config_file)?;

    // Held for the lifetime of the process so queued events are flushed on exit.
    let _sentry = init_logging(&config.common);

    if let Some(metrics_config) = &config.common.metrics {
        init_metrics(metrics_config)?;
    }
    shared::metrics_defs::describe_all(identity::ALL_METRICS);
    shared::metrics_defs::describe_all(proxy::metrics_defs::ALL_METRICS);

    tracing::info!(config_file = %args.config_file.display(), "Starting gateway");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(proxy::run(config.gateway))?;

    Ok(())
}

fn init_logging(common: &CommonConfig) -> Option<sentry::ClientInitGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let guard = common.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(METRICS_PREFIX))
        .map_err(|e| CliError::Metrics(e.to_string()))?;

    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;
    Ok(())
}
