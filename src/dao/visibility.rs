//! Visibility scoping for repositories and snapshots.
//!
//! A repository is readable by an organization when any of these hold:
//! a non-deleted configuration is owned by the organization, a non-deleted
//! configuration is owned by the curated Red Hat organization, the repository
//! is public, or its URL is on the popular allow-list. Callers that pass
//! explicit URL or configuration UUID filters get the intersection of the
//! readable set with the union of those filters.
//!
//! Requests for something outside the readable set report `NotFound`, so
//! callers cannot probe for other organizations' content.

use std::collections::HashSet;

use sea_orm::sea_query::{Expr, SelectStatement};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, QueryTrait, RelationDef, RelationTrait, Select,
};
use uuid::Uuid;

use crate::config::CatalogPolicy;
use crate::error::DaoError;
use crate::models::repository::{self, normalize_url};
use crate::models::{repository_configuration, snapshot};

/// Organization-independent inputs of the readable predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityPolicy {
    pub red_hat_org_id: String,
    pub popular_urls: Vec<String>,
}

impl From<&CatalogPolicy> for VisibilityPolicy {
    fn from(policy: &CatalogPolicy) -> Self {
        Self {
            red_hat_org_id: policy.red_hat_org_id.clone(),
            popular_urls: policy
                .popular_repository_urls
                .iter()
                .map(|url| normalize_url(url))
                .collect(),
        }
    }
}

/// A repository matched by [`ReadableRepositories::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct ReadableRow {
    pub repository_uuid: Uuid,
    pub url: String,
    /// Configuration that granted access, if access came through one
    pub configuration_uuid: Option<Uuid>,
}

/// Repositories readable by one organization, optionally narrowed by URL or
/// configuration UUID.
#[derive(Debug, Clone)]
pub struct ReadableRepositories {
    org_id: String,
    policy: VisibilityPolicy,
    urls: Vec<String>,
    uuids: Vec<Uuid>,
}

impl ReadableRepositories {
    pub fn new(org_id: impl Into<String>, policy: VisibilityPolicy) -> Self {
        Self {
            org_id: org_id.into(),
            policy,
            urls: Vec::new(),
            uuids: Vec::new(),
        }
    }

    /// Restricts to repositories with one of these URLs (normalized first).
    pub fn with_urls(mut self, urls: &[String]) -> Self {
        self.urls = urls.iter().map(|url| normalize_url(url)).collect();
        self
    }

    /// Restricts to repositories reached through one of these configuration UUIDs.
    pub fn with_uuids(mut self, uuids: &[Uuid]) -> Self {
        self.uuids = uuids.to_vec();
        self
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    fn visible_org_ids(&self) -> [String; 2] {
        [self.org_id.clone(), self.policy.red_hat_org_id.clone()]
    }

    /// LEFT JOIN onto the configurations owned by the org or the curated org.
    fn configuration_join(&self) -> RelationDef {
        let org_ids = self.visible_org_ids();
        repository::Relation::RepositoryConfigurations
            .def()
            .on_condition(move |_left, right| {
                Condition::all()
                    .add(
                        Expr::col((right.clone(), repository_configuration::Column::OrgId))
                            .is_in(org_ids.clone()),
                    )
                    .add(Expr::col((right, repository_configuration::Column::DeletedAt)).is_null())
            })
    }

    /// The readable predicate combined with any explicit filters.
    ///
    /// Only valid on a query that includes [`Self::joined`]'s configuration join.
    pub fn condition(&self) -> Condition {
        let mut readable = Condition::any()
            .add(repository_configuration::Column::OrgId.is_in(self.visible_org_ids()))
            .add(repository::Column::Public.eq(true));

        if !self.policy.popular_urls.is_empty() {
            readable = readable.add(repository::Column::Url.is_in(self.policy.popular_urls.clone()));
        }

        let mut condition = Condition::all().add(readable);

        if !self.urls.is_empty() || !self.uuids.is_empty() {
            let mut requested = Condition::any();
            if !self.urls.is_empty() {
                requested = requested.add(repository::Column::Url.is_in(self.urls.clone()));
            }
            if !self.uuids.is_empty() {
                requested = requested
                    .add(repository_configuration::Column::Uuid.is_in(self.uuids.iter().copied()));
            }
            condition = condition.add(requested);
        }

        condition
    }

    /// Repositories joined with the configurations that can grant access.
    ///
    /// A repository appears once per granting configuration.
    pub fn joined(&self) -> Select<repository::Entity> {
        repository::Entity::find()
            .join(JoinType::LeftJoin, self.configuration_join())
            .filter(self.condition())
    }

    /// `SELECT repositories.uuid ...` usable inside `IN (...)`.
    pub fn subquery(&self) -> SelectStatement {
        self.joined()
            .select_only()
            .column(repository::Column::Uuid)
            .into_query()
    }

    /// Distinct readable repositories as a top-level query.
    pub fn select(&self) -> Select<repository::Entity> {
        repository::Entity::find().filter(repository::Column::Uuid.in_subquery(self.subquery()))
    }

    /// Loads every `(repository, url, configuration)` row matching the predicate.
    pub async fn resolve<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<ReadableRow>, DaoError> {
        let rows = self
            .joined()
            .select_only()
            .column_as(repository::Column::Uuid, "repository_uuid")
            .column_as(repository::Column::Url, "url")
            .column_as(repository_configuration::Column::Uuid, "configuration_uuid")
            .into_model::<ReadableRow>()
            .all(db)
            .await?;
        Ok(rows)
    }

    /// Resolves the filters and fails with `NotFound` for the first requested
    /// UUID or URL that is not readable. Returns the distinct repository UUIDs.
    pub async fn resolve_requested<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<Uuid>, DaoError> {
        let rows = self.resolve(db).await?;
        ensure_requested_found(&self.uuids, &self.urls, &rows)?;

        let mut seen = HashSet::new();
        Ok(rows
            .into_iter()
            .map(|row| row.repository_uuid)
            .filter(|uuid| seen.insert(*uuid))
            .collect())
    }
}

/// Checks that every requested configuration UUID and URL appears in `rows`.
pub fn ensure_requested_found(
    uuids: &[Uuid],
    urls: &[String],
    rows: &[ReadableRow],
) -> Result<(), DaoError> {
    let found_uuids: HashSet<Uuid> = rows.iter().filter_map(|row| row.configuration_uuid).collect();
    if let Some(missing) = uuids.iter().find(|uuid| !found_uuids.contains(uuid)) {
        return Err(DaoError::not_found(format!(
            "Could not find repository with UUID: {missing}"
        )));
    }

    let found_urls: HashSet<&str> = rows.iter().map(|row| row.url.as_str()).collect();
    if let Some(missing) = urls.iter().find(|url| !found_urls.contains(url.as_str())) {
        return Err(DaoError::not_found(format!(
            "Could not find repository with URL: {missing}"
        )));
    }

    Ok(())
}

/// Snapshots whose configuration is owned by the org or the curated org and
/// has not been deleted.
#[derive(Debug, Clone)]
pub struct ReadableSnapshots {
    org_id: String,
    red_hat_org_id: String,
}

impl ReadableSnapshots {
    pub fn new(org_id: impl Into<String>, policy: &VisibilityPolicy) -> Self {
        Self {
            org_id: org_id.into(),
            red_hat_org_id: policy.red_hat_org_id.clone(),
        }
    }

    pub fn condition(&self) -> Condition {
        Condition::all()
            .add(
                repository_configuration::Column::OrgId
                    .is_in([self.org_id.clone(), self.red_hat_org_id.clone()]),
            )
            .add(repository_configuration::Column::DeletedAt.is_null())
    }

    pub fn select(&self) -> Select<snapshot::Entity> {
        snapshot::Entity::find()
            .join(
                JoinType::InnerJoin,
                snapshot::Relation::RepositoryConfiguration.def(),
            )
            .filter(self.condition())
    }

    /// Loads the requested snapshots, failing with `NotFound` for the first
    /// one that does not exist or is not readable.
    pub async fn resolve<C: ConnectionTrait>(
        &self,
        db: &C,
        uuids: &[Uuid],
    ) -> Result<Vec<snapshot::Model>, DaoError> {
        if uuids.is_empty() {
            return Ok(Vec::new());
        }

        let snapshots = self
            .select()
            .filter(snapshot::Column::Uuid.is_in(uuids.iter().copied()))
            .all(db)
            .await?;

        let found: HashSet<Uuid> = snapshots.iter().map(|s| s.uuid).collect();
        if let Some(missing) = uuids.iter().find(|uuid| !found.contains(uuid)) {
            return Err(DaoError::not_found(format!(
                "Could not find snapshot with UUID: {missing}"
            )));
        }

        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn policy() -> VisibilityPolicy {
        VisibilityPolicy {
            red_hat_org_id: "-1".to_string(),
            popular_urls: vec!["https://popular.example.test/repo".to_string()],
        }
    }

    #[test]
    fn join_scopes_configurations_to_org_and_curated_org() {
        let sql = ReadableRepositories::new("acme", policy())
            .subquery()
            .to_string(sea_orm::sea_query::PostgresQueryBuilder);

        assert!(sql.contains("LEFT JOIN \"repository_configurations\""));
        assert!(sql.contains("IN ('acme', '-1')"));
        assert!(sql.contains("\"deleted_at\" IS NULL"));
        assert!(sql.contains("\"public\" = TRUE"));
        assert!(sql.contains("https://popular.example.test/repo"));
    }

    #[test]
    fn filters_are_unioned_and_urls_normalized() {
        let uuid = Uuid::new_v4();
        let sql = ReadableRepositories::new("acme", policy())
            .with_urls(&["https://one.example.test/repo/".to_string()])
            .with_uuids(&[uuid])
            .joined()
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains("'https://one.example.test/repo'"));
        assert!(sql.contains(&uuid.to_string()));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn empty_popular_list_adds_no_url_clause() {
        let sql = ReadableRepositories::new(
            "acme",
            VisibilityPolicy {
                red_hat_org_id: "-1".to_string(),
                popular_urls: Vec::new(),
            },
        )
        .joined()
        .build(DbBackend::Postgres)
        .to_string();

        assert!(!sql.contains("\"url\" IN"));
    }

    #[test]
    fn requested_uuid_must_resolve_before_urls() {
        let granted = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let rows = vec![ReadableRow {
            repository_uuid: Uuid::new_v4(),
            url: "https://one.example.test".to_string(),
            configuration_uuid: Some(granted),
        }];

        assert!(ensure_requested_found(&[granted], &[], &rows).is_ok());

        let err = ensure_requested_found(
            &[granted, missing],
            &["https://absent.example.test".to_string()],
            &rows,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Could not find repository with UUID: {missing}")
        );

        let err = ensure_requested_found(&[], &["https://absent.example.test".to_string()], &rows)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("URL: https://absent.example.test"));
    }
}
