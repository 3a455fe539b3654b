//! Database connection and pool management for the content sources catalog.
//!
//! The catalog runs on Postgres in production and on SQLite for tests and
//! local experiments. This module builds the pool for either backend, applies
//! migrations and provides the health check behind `/ping`.

use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::AppConfig;

const CONNECT_ATTEMPTS: u32 = 5;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {source}")]
    ConnectionFailed {
        #[from]
        source: sea_orm::DbErr,
    },
    #[error("Database connection timeout after {timeout_ms}ms")]
    ConnectionTimeout { timeout_ms: u64 },
    #[error("Invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Backends the catalog migrations are written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogBackend {
    Postgres,
    Sqlite { in_memory: bool },
}

impl CatalogBackend {
    pub fn from_url(url: &str) -> Result<Self, DatabaseError> {
        let url = url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else if let Some(rest) = url.strip_prefix("sqlite:") {
            Ok(Self::Sqlite {
                in_memory: rest.contains(":memory:") || rest.contains("mode=memory"),
            })
        } else if url.is_empty() {
            Err(DatabaseError::InvalidConfiguration {
                message: "Database URL cannot be empty".to_string(),
            })
        } else {
            Err(DatabaseError::InvalidConfiguration {
                message: "Database URL must use the postgres or sqlite scheme".to_string(),
            })
        }
    }
}

/// Pool options for the configured backend.
///
/// Every connection to an in-memory SQLite database opens a fresh, empty
/// database, so those pools are pinned to a single connection that never
/// expires.
pub fn connect_options(cfg: &AppConfig) -> Result<ConnectOptions, DatabaseError> {
    let backend = CatalogBackend::from_url(&cfg.database_url)?;

    let mut opt = ConnectOptions::new(cfg.database_url.trim());
    opt.acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    match backend {
        CatalogBackend::Sqlite { in_memory: true } => {
            opt.max_connections(1).min_connections(1);
        }
        _ => {
            opt.max_connections(cfg.db_max_connections)
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800));
        }
    }

    Ok(opt)
}

/// Initializes a database connection pool with the given configuration.
///
/// Transient connection failures are retried with exponential backoff.
///
/// ```no_run
/// use content_sources::{config::AppConfig, db::init_pool};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = AppConfig::default();
///     let db = init_pool(&config).await?;
///     Ok(())
/// }
/// ```
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    let opt = connect_options(cfg)?;
    let mut retry_delay = INITIAL_RETRY_DELAY;

    for attempt in 1..=CONNECT_ATTEMPTS {
        match Database::connect(opt.clone()).await {
            Ok(conn) => {
                log::info!(
                    "Connected to {:?} catalog database (attempt {})",
                    conn.get_database_backend(),
                    attempt
                );
                return Ok(conn);
            }
            Err(e) if attempt == CONNECT_ATTEMPTS => {
                log::error!(
                    "Failed to connect to catalog database after {} attempts: {}",
                    CONNECT_ATTEMPTS,
                    e
                );
                return Err(DatabaseError::ConnectionFailed { source: e }.into());
            }
            Err(e) => {
                log::warn!(
                    "Catalog database connection attempt {} failed: {}, retrying in {:?}",
                    attempt,
                    e,
                    retry_delay
                );
                sleep(retry_delay).await;
                retry_delay *= 2;
            }
        }
    }

    Err(DatabaseError::ConnectionTimeout {
        timeout_ms: cfg.db_acquire_timeout_ms,
    }
    .into())
}

/// Applies all pending catalog migrations.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .context("Failed to apply catalog migrations")?;
    log::info!("Catalog migrations applied");
    Ok(())
}

/// Verifies that the database answers queries.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    let stmt = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());

    db.query_one(stmt)
        .await
        .context("Database health check failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> AppConfig {
        AppConfig {
            database_url: url.to_string(),
            db_max_connections: 7,
            ..Default::default()
        }
    }

    #[test]
    fn backend_is_detected_from_scheme() {
        assert_eq!(
            CatalogBackend::from_url("postgresql://u:p@db/content").unwrap(),
            CatalogBackend::Postgres
        );
        assert_eq!(
            CatalogBackend::from_url("sqlite::memory:").unwrap(),
            CatalogBackend::Sqlite { in_memory: true }
        );
        assert_eq!(
            CatalogBackend::from_url("sqlite://catalog.db?mode=rwc").unwrap(),
            CatalogBackend::Sqlite { in_memory: false }
        );
        assert!(matches!(
            CatalogBackend::from_url("mysql://db/content"),
            Err(DatabaseError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn in_memory_sqlite_uses_one_connection() {
        let opt = connect_options(&config("sqlite::memory:")).unwrap();
        assert_eq!(opt.get_max_connections(), Some(1));

        let opt = connect_options(&config("postgresql://u:p@db/content")).unwrap();
        assert_eq!(opt.get_max_connections(), Some(7));
    }

    #[tokio::test]
    async fn test_invalid_database_url() {
        let result = init_pool(&config("")).await;

        assert!(matches!(
            result.unwrap_err().downcast::<DatabaseError>(),
            Ok(DatabaseError::InvalidConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn test_health_check_on_sqlite() {
        let db = init_pool(&config("sqlite::memory:")).await.unwrap();
        run_migrations(&db).await.unwrap();
        assert!(health_check(&db).await.is_ok());
    }
}
