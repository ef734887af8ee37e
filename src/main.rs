//! hookmon - GitHub webhook delivery monitor
//!
//! A CLI tool that lists recent webhook deliveries across every repository
//! of an organization (or a single repository), with filtering by target
//! URL, time range and outcome.
//!
//! Exit codes:
//!   0 - Success (including an empty result)
//!   1 - Invalid arguments, configuration or authentication, or the target
//!       could not be read

mod cli;
mod config;
mod error;
mod filters;
mod github;
mod models;
mod ordering;
mod pipeline;
mod pool;
mod report;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE};
use error::ApiError;
use github::{resolve_token, DeliverySource, GithubClient};
use pipeline::{Pipeline, RunSummary};
use report::TableOptions;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    // Handle --init-config early (no target or logging needed)
    if args.init_config {
        return handle_init_config();
    }

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    init_logging(&args);

    info!("hookmon v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("{}", failure_message(&e));
            std::process::exit(1);
        }
    }
}

/// Text printed for a failed run. Rejected credentials get a hint unless
/// the error already carries one.
fn failure_message(e: &anyhow::Error) -> String {
    let mut message = format!("Error: {:#}", e);
    let rejected = matches!(
        e.downcast_ref::<ApiError>(),
        Some(api) if api.is_auth() && !matches!(api, ApiError::MissingToken(_))
    );
    if rejected {
        message.push_str("\nHint: check the token passed via --token, GH_TOKEN or GITHUB_TOKEN.");
    }
    message
}

/// Handle --init-config: generate a default .hookmon.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging on stderr. `RUST_LOG` overrides the verbosity flags.
fn init_logging(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let query = args.to_query(&config)?;
    let limits = config.limits()?;
    info!("Target: {}", query.target);

    let token = resolve_token(args.explicit_token().as_deref())?;
    let client = GithubClient::new(config.client_options(token))?;
    let source: Arc<dyn DeliverySource> = Arc::new(client);

    let show_progress = !args.quiet && !config.output.json && std::io::stderr().is_terminal();
    let summary = Pipeline::new(source, query, limits)
        .with_progress(show_progress)
        .run()
        .await?;

    let options = TableOptions {
        color: !config.output.no_color && std::io::stdout().is_terminal(),
    };
    let mut stdout = std::io::stdout().lock();
    report::write_report(&mut stdout, &summary.deliveries, config.output.json, options)
        .context("Failed to write output")?;

    log_summary(&summary, start_time.elapsed().as_secs_f64());
    Ok(())
}

fn log_summary(summary: &RunSummary, duration: f64) {
    if summary.repositories_failed > 0 {
        warn!(
            "{} of {} repositories could not be read",
            summary.repositories_failed, summary.repositories_scanned
        );
    }
    if summary.enrichment_failed > 0 {
        warn!(
            "{} deliveries dropped because their details could not be fetched",
            summary.enrichment_failed
        );
    }
    info!(
        "Showing {} deliveries ({} repositories scanned, {} failed, {} enrichment failures) in {:.1}s",
        summary.deliveries.len(),
        summary.repositories_scanned,
        summary.repositories_failed,
        summary.enrichment_failed,
        duration
    );
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
