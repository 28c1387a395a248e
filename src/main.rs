use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use datalake2bq::{build_pipeline, default_window_start, init_tracing};
use datalake2bq_config::RuntimeConfig;
use std::path::PathBuf;
use tracing::{error, info};

/// Load analytics data-lake exports into BigQuery
#[derive(Parser)]
#[command(name = "datalake2bq")]
#[command(version)]
#[command(about = "Load analytics data-lake exports into BigQuery", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// List exports created at or after this instant (RFC 3339) instead of now minus the lookback
    #[arg(short, long, value_name = "TIMESTAMP")]
    window_start: Option<DateTime<Utc>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load().context("Failed to load configuration")?
    };

    apply_cli_overrides(&mut config, &cli);
    init_tracing(&config.log);

    let window_start = cli
        .window_start
        .unwrap_or_else(|| default_window_start(Utc::now(), config.source.lookback()));

    let pipeline = match build_pipeline(&config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Run aborted before listing");
            return Err(e);
        }
    };

    let summary = pipeline.run_once(window_start).await?;
    info!(
        window_start = %summary.window_start,
        pages = summary.pages,
        listed = summary.listed,
        resolved = summary.resolved,
        staged = summary.transfers.succeeded,
        staged_rows = summary.staged_rows,
        loaded = summary.loads.succeeded,
        purged_objects = summary.purged_objects,
        deduplicated = summary.dedups.succeeded,
        "datalake2bq finished"
    );
    Ok(())
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
}
