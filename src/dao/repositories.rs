//! Repository DAO: URL lookup, public listing, introspection bookkeeping.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::api::Page;
use crate::api::repositories::PublicRepository;
use crate::config::CatalogPolicy;
use crate::dao::orphans::sweep_repositories;
use crate::error::DaoError;
use crate::models::repository::{self, IntrospectionStatus, normalize_url};
use crate::models::repository_rpm;

/// Longest introspection error stored on a repository
pub const MAX_INTROSPECTION_ERROR_LEN: usize = 255;

/// Partial repository update. `None` leaves a field untouched; `Some` writes
/// the value even when it is empty or zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryUpdate {
    pub uuid: Uuid,
    pub url: Option<String>,
    pub public: Option<bool>,
    pub repomd_checksum: Option<String>,
    pub last_introspection_time: Option<DateTime<Utc>>,
    pub last_introspection_success_time: Option<DateTime<Utc>>,
    pub last_introspection_update_time: Option<DateTime<Utc>>,
    pub last_introspection_error: Option<String>,
    pub status: Option<IntrospectionStatus>,
    pub package_count: Option<i32>,
    pub failed_introspections_count: Option<i32>,
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[derive(Clone)]
pub struct RepositoryDao {
    db: DatabaseConnection,
    policy: Arc<CatalogPolicy>,
}

impl RepositoryDao {
    pub fn new(db: DatabaseConnection, policy: Arc<CatalogPolicy>) -> Self {
        Self { db, policy }
    }

    pub async fn fetch_for_url(&self, url: &str) -> Result<repository::Model, DaoError> {
        let url = normalize_url(url);
        repository::Entity::find()
            .filter(repository::Column::Url.eq(url.as_str()))
            .one(&self.db)
            .await?
            .ok_or_else(|| DaoError::not_found(format!("Could not find repository with URL {url}")))
    }

    pub async fn list_public(
        &self,
        page: &Page,
    ) -> Result<(Vec<PublicRepository>, u64), DaoError> {
        let query = repository::Entity::find().filter(repository::Column::Public.eq(true));
        let total = query.clone().count(&self.db).await?;

        let repositories = query
            .order_by_asc(repository::Column::Url)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok((
            repositories.into_iter().map(PublicRepository::from).collect(),
            total,
        ))
    }

    pub async fn update(&self, update: RepositoryUpdate) -> Result<(), DaoError> {
        let existing = repository::Entity::find_by_id(update.uuid)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                DaoError::not_found(format!("Could not find repository with UUID {}", update.uuid))
            })?;

        let mut active: repository::ActiveModel = existing.into();

        if let Some(url) = update.url {
            active.url = Set(normalize_url(&url));
        }
        if let Some(public) = update.public {
            active.public = Set(public);
        }
        if let Some(checksum) = update.repomd_checksum {
            active.repomd_checksum = Set(checksum);
        }
        if let Some(time) = update.last_introspection_time {
            active.last_introspection_time = Set(Some(time.fixed_offset()));
        }
        if let Some(time) = update.last_introspection_success_time {
            active.last_introspection_success_time = Set(Some(time.fixed_offset()));
        }
        if let Some(time) = update.last_introspection_update_time {
            active.last_introspection_update_time = Set(Some(time.fixed_offset()));
        }
        if let Some(error) = update.last_introspection_error {
            active.last_introspection_error =
                Set(Some(truncate_chars(&error, MAX_INTROSPECTION_ERROR_LEN)));
        }
        if let Some(status) = update.status {
            active.status = Set(status);
        }
        if let Some(count) = update.package_count {
            active.package_count = Set(count);
        }
        if let Some(count) = update.failed_introspections_count {
            active.failed_introspections_count = Set(count);
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        active.update(&self.db).await?;
        Ok(())
    }

    pub async fn mark_as_not_public(&self, url: &str) -> Result<(), DaoError> {
        let url = normalize_url(url);
        let result = repository::Entity::update_many()
            .col_expr(repository::Column::Public, Expr::value(false))
            .col_expr(
                repository::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(repository::Column::Url.eq(url.as_str()))
            .exec(&self.db)
            .await?;

        tracing::info!(url = %url, updated = result.rows_affected, "Marked repository as not public");
        Ok(())
    }

    pub async fn fetch_rpm_count(&self, repository_uuid: Uuid) -> Result<u64, DaoError> {
        Ok(repository_rpm::Entity::find()
            .filter(repository_rpm::Column::RepositoryUuid.eq(repository_uuid))
            .count(&self.db)
            .await?)
    }

    /// Repositories due for introspection.
    ///
    /// Unless `force` is set a repository is due when its last introspection was
    /// not valid or is older than the introspection interval, and it has not
    /// failed more often than the limit (public repositories are always retried).
    pub async fn list_for_introspection(
        &self,
        urls: Option<&[String]>,
        force: bool,
    ) -> Result<Vec<repository::Model>, DaoError> {
        let mut query = repository::Entity::find();

        if let Some(urls) = urls {
            let urls: Vec<String> = urls.iter().map(|url| normalize_url(url)).collect();
            query = query.filter(repository::Column::Url.is_in(urls));
        }

        if !force {
            let threshold = (Utc::now()
                - Duration::hours(i64::from(self.policy.introspect_interval_hours)))
            .fixed_offset();

            query = query
                .filter(
                    Condition::any()
                        .add(repository::Column::Status.ne(IntrospectionStatus::Valid))
                        .add(repository::Column::LastIntrospectionTime.is_null())
                        .add(repository::Column::LastIntrospectionTime.lt(threshold)),
                )
                .filter(
                    Condition::any()
                        .add(
                            repository::Column::FailedIntrospectionsCount
                                .lte(self.policy.failed_introspections_limit as i32),
                        )
                        .add(repository::Column::Public.eq(true)),
                );
        }

        Ok(query
            .order_by_asc(repository::Column::Url)
            .all(&self.db)
            .await?)
    }

    /// Deletes unreferenced repositories older than `retention_days`.
    pub async fn orphan_cleanup(&self, retention_days: u32) -> Result<u64, DaoError> {
        let deleted = sweep_repositories(&self.db, retention_days).await?;
        tracing::debug!(deleted, retention_days, "Removed orphaned repositories");
        Ok(deleted)
    }
}
