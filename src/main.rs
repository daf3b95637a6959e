use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use feedwatch::config::Config;
use feedwatch::pipeline::Pipeline;
use feedwatch::server::{router, AppState};
use feedwatch::storage::Database;

#[derive(Parser, Debug)]
#[command(
    name = "feedwatch",
    about = "Polls RSS feeds and posts new items to a chat webhook"
)]
struct Args {
    /// Path to the TOML config file
    #[arg(long, value_name = "FILE", default_value = "feedwatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one poll cycle, print the run summary as JSON, and exit
    Once,
    /// Serve the on-demand HTTP endpoint and run on a schedule
    Serve {
        /// Address to bind the HTTP server to
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load config up front even in serve mode: a broken feed list should
    // fail at startup, not at the first scheduled run.
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let db = Database::open(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;

    match args.command.unwrap_or(Command::Once) {
        Command::Once => {
            let summary = Pipeline::new(config, db).run().await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Serve { listen } => {
            let state = AppState {
                db,
                config_path: Arc::new(args.config),
            };

            // interval(0) panics; a zero config value means "every minute"
            let every = Duration::from_secs(config.interval_minutes.max(1) * 60);
            tokio::spawn(scheduler_loop(state.clone(), every));

            let listener = tokio::net::TcpListener::bind(listen)
                .await
                .with_context(|| format!("Failed to bind {}", listen))?;
            tracing::info!(addr = %listen, "Serving HTTP endpoint");
            axum::serve(listener, router(state)).await?;
        }
    }

    Ok(())
}

/// Scheduled entry point: one run per interval, first run at startup.
///
/// Config is re-loaded per run so feed-list edits apply without a restart;
/// a load failure skips that run rather than killing the scheduler.
async fn scheduler_loop(state: AppState, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match Config::load(&state.config_path) {
            Ok(config) => {
                tracing::info!("Scheduled run starting");
                let summary = Pipeline::new(config, state.db.clone()).run().await;
                tracing::info!(message = %summary.message, "Scheduled run finished");
            }
            Err(e) => {
                tracing::error!(error = %e, "Config load failed, skipping scheduled run");
            }
        }
    }
}
