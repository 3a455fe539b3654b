//! # Content Sources Entry Point
//!
//! Runs the catalog API, or one of the maintenance commands against the
//! configured database.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use content_sources::{
    config::ConfigLoader,
    dao::OrphanCollector,
    db, seeds,
    server::{AppState, run_server},
    telemetry,
};
use tokio_util::sync::CancellationToken;

/// Content sources catalog service
#[derive(Parser, Debug)]
#[command(name = "content-sources")]
#[command(about = "Catalog of RPM repositories, packages, snapshots and templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Default)]
enum Command {
    /// Serve the HTTP API (default)
    #[default]
    Serve,
    /// Apply pending database migrations
    Migrate,
    /// Seed the popular repositories
    Seed,
    /// Run one orphan sweep and exit
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing telemetry")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(configuration = %redacted_json, "Effective configuration");
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    match cli.command.unwrap_or_default() {
        Command::Serve => {
            db::run_migrations(&db).await?;

            let shutdown = CancellationToken::new();
            let collector = config.orphans.enabled.then(|| {
                let collector = OrphanCollector::new(db.clone(), &config.orphans);
                tokio::spawn(collector.run(shutdown.child_token()))
            });

            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Shutdown signal received");
                }
                signal.cancel();
            });

            let state = AppState::new(config, db);
            let result = run_server(state, shutdown.clone()).await;
            shutdown.cancel();
            if let Some(handle) = collector
                && let Err(err) = handle.await
            {
                tracing::warn!(error = %err, "Orphan collector task ended abnormally");
            }
            result
        }
        Command::Migrate => db::run_migrations(&db).await,
        Command::Seed => {
            let created = seeds::seed_popular_repositories(&db, &config.catalog_policy()).await?;
            tracing::info!(created, "Seed completed");
            Ok(())
        }
        Command::Cleanup => {
            let report = OrphanCollector::new(db, &config.orphans)
                .run_once()
                .await
                .context("running orphan sweep")?;
            tracing::info!(
                repositories = report.repositories,
                packages = report.packages,
                "Cleanup completed"
            );
            Ok(())
        }
    }
}
