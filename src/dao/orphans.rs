//! # Orphan Collector
//!
//! Reclaims catalog rows nothing references anymore:
//!
//! * packages without any repository association that are older than the
//!   package grace window, so an ingestion that has inserted rows but not yet
//!   associated them is never raced
//! * repositories that are not public, have no configuration rows (soft-deleted
//!   configurations still count as references) and were created before the
//!   retention window
//!
//! Both sweeps are single delete statements scoped by sub-queries, so running
//! them twice or alongside readers is harmless. The collector also runs as a
//! background loop next to the HTTP server.

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, histogram};
use sea_orm::sea_query::SelectStatement;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect,
    QueryTrait, TransactionTrait,
};
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::OrphanSweepConfig;
use crate::models::{
    repository, repository_configuration, repository_module_stream, repository_rpm, rpm,
};

/// Rows removed by one collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrphanSweepReport {
    pub repositories: u64,
    pub packages: u64,
}

/// Grace window for [`sweep_packages`], saturating on out-of-range input.
pub fn grace_window(seconds: u64) -> Duration {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Deletes packages that no repository lists and that were created more
/// than `grace` ago.
pub async fn sweep_packages<C: ConnectionTrait>(db: &C, grace: Duration) -> Result<u64, DbErr> {
    let cutoff = Utc::now()
        .checked_sub_signed(grace)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
        .fixed_offset();
    let referenced = repository_rpm::Entity::find()
        .select_only()
        .column(repository_rpm::Column::RpmUuid)
        .into_query();

    let result = rpm::Entity::delete_many()
        .filter(rpm::Column::CreatedAt.lt(cutoff))
        .filter(rpm::Column::Uuid.not_in_subquery(referenced))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

fn orphaned_repositories(retention_days: u32) -> SelectStatement {
    let cutoff = (Utc::now() - Duration::days(i64::from(retention_days))).fixed_offset();

    let configured = repository_configuration::Entity::find()
        .select_only()
        .column(repository_configuration::Column::RepositoryUuid)
        .into_query();

    repository::Entity::find()
        .select_only()
        .column(repository::Column::Uuid)
        .filter(repository::Column::Public.eq(false))
        .filter(repository::Column::CreatedAt.lt(cutoff))
        .filter(repository::Column::Uuid.not_in_subquery(configured))
        .into_query()
}

/// Deletes unreferenced, non-public repositories older than `retention_days`,
/// together with their association rows.
pub async fn sweep_repositories<C>(db: &C, retention_days: u32) -> Result<u64, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    repository_rpm::Entity::delete_many()
        .filter(
            repository_rpm::Column::RepositoryUuid
                .in_subquery(orphaned_repositories(retention_days)),
        )
        .exec(&txn)
        .await?;

    repository_module_stream::Entity::delete_many()
        .filter(
            repository_module_stream::Column::RepositoryUuid
                .in_subquery(orphaned_repositories(retention_days)),
        )
        .exec(&txn)
        .await?;

    let result = repository::Entity::delete_many()
        .filter(repository::Column::Uuid.in_subquery(orphaned_repositories(retention_days)))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    Ok(result.rows_affected)
}

/// Periodic orphan sweep.
#[derive(Clone)]
pub struct OrphanCollector {
    db: DatabaseConnection,
    retention_days: u32,
    package_grace: Duration,
    interval: TokioDuration,
}

impl OrphanCollector {
    pub fn new(db: DatabaseConnection, config: &OrphanSweepConfig) -> Self {
        Self {
            db,
            retention_days: config.retention_days,
            package_grace: grace_window(config.package_grace_seconds),
            interval: TokioDuration::from_secs(config.interval_seconds),
        }
    }

    /// Override the sweep interval (primarily for tests).
    pub fn with_interval(mut self, interval: TokioDuration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn sweep_packages(&self) -> Result<u64, DbErr> {
        sweep_packages(&self.db, self.package_grace).await
    }

    pub async fn sweep_repositories(&self) -> Result<u64, DbErr> {
        sweep_repositories(&self.db, self.retention_days).await
    }

    /// One pass: repositories first so their packages become collectable.
    pub async fn run_once(&self) -> Result<OrphanSweepReport, DbErr> {
        let repositories = self.sweep_repositories().await?;
        let packages = self.sweep_packages().await?;

        counter!("orphan_collector_repositories_deleted_total").increment(repositories);
        counter!("orphan_collector_packages_deleted_total").increment(packages);

        let report = OrphanSweepReport {
            repositories,
            packages,
        };
        debug!(
            repositories = report.repositories,
            packages = report.packages,
            retention_days = self.retention_days,
            package_grace_seconds = self.package_grace.num_seconds(),
            "Orphan sweep completed"
        );
        Ok(report)
    }

    /// Sweep on every interval until `shutdown` fires. Failed passes are logged
    /// and retried on the next interval.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_seconds = self.interval.as_secs(),
            retention_days = self.retention_days,
            "Starting orphan collector"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Orphan collector shutdown requested");
                    break;
                }
                _ = sleep(self.interval) => {
                    let started = Instant::now();
                    match self.run_once().await {
                        Ok(report) if report.repositories + report.packages > 0 => {
                            info!(
                                repositories = report.repositories,
                                packages = report.packages,
                                "Removed orphaned catalog rows"
                            );
                        }
                        Ok(_) => {}
                        Err(err) => {
                            counter!("orphan_collector_failures_total").increment(1);
                            error!(error = ?err, "Orphan sweep failed");
                        }
                    }
                    histogram!("orphan_collector_sweep_duration_ms")
                        .record(started.elapsed().as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Orphan collector stopped");
    }
}
