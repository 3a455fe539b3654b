//! Snapshot persistence and point-in-time lookup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::api::Page;
use crate::api::snapshots::SnapshotResponse;
use crate::config::CatalogPolicy;
use crate::dao::visibility::{ReadableSnapshots, VisibilityPolicy};
use crate::error::DaoError;
use crate::models::{repository_configuration, snapshot};

/// A snapshot captured by the content service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotInput {
    pub repository_configuration_uuid: Uuid,
    pub version_href: String,
    pub publication_href: String,
    pub distribution_path: String,
    pub distribution_href: String,
    pub content_counts: JsonValue,
    pub added_counts: JsonValue,
    pub removed_counts: JsonValue,
}

#[derive(Clone)]
pub struct SnapshotDao {
    db: DatabaseConnection,
    policy: Arc<CatalogPolicy>,
}

impl SnapshotDao {
    pub fn new(db: DatabaseConnection, policy: Arc<CatalogPolicy>) -> Self {
        Self { db, policy }
    }

    fn readable(&self, org_id: &str) -> ReadableSnapshots {
        ReadableSnapshots::new(org_id, &VisibilityPolicy::from(self.policy.as_ref()))
    }

    /// Records a snapshot for an existing repository configuration.
    pub async fn create(&self, input: SnapshotInput) -> Result<snapshot::Model, DaoError> {
        let configuration =
            repository_configuration::Entity::find_by_id(input.repository_configuration_uuid)
                .one(&self.db)
                .await?;
        if configuration.is_none() {
            return Err(DaoError::not_found(format!(
                "Could not find repository with UUID {}",
                input.repository_configuration_uuid
            )));
        }

        let json_or_empty = |value: JsonValue| {
            if value.is_null() {
                JsonValue::Object(Default::default())
            } else {
                value
            }
        };

        let model = snapshot::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            repository_configuration_uuid: Set(input.repository_configuration_uuid),
            version_href: Set(input.version_href),
            publication_href: Set(input.publication_href),
            distribution_path: Set(input.distribution_path),
            distribution_href: Set(input.distribution_href),
            content_counts: Set(json_or_empty(input.content_counts)),
            added_counts: Set(json_or_empty(input.added_counts)),
            removed_counts: Set(json_or_empty(input.removed_counts)),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(
            snapshot_uuid = %model.uuid,
            repository_configuration_uuid = %model.repository_configuration_uuid,
            "Recorded snapshot"
        );

        Ok(model)
    }

    /// Snapshots of one configuration, newest first.
    pub async fn list_by_repository_configuration(
        &self,
        org_id: &str,
        repository_configuration_uuid: Uuid,
        page: &Page,
    ) -> Result<(Vec<SnapshotResponse>, u64), DaoError> {
        let configuration = repository_configuration::Entity::find_by_id(
            repository_configuration_uuid,
        )
        .filter(
            repository_configuration::Column::OrgId
                .is_in([org_id.to_string(), self.policy.red_hat_org_id.clone()]),
        )
        .filter(repository_configuration::Column::DeletedAt.is_null())
        .one(&self.db)
        .await?;

        if configuration.is_none() {
            return Err(DaoError::not_found(format!(
                "Could not find repository with UUID {repository_configuration_uuid}"
            )));
        }

        let query = snapshot::Entity::find()
            .filter(snapshot::Column::RepositoryConfigurationUuid.eq(repository_configuration_uuid));

        let total = query.clone().count(&self.db).await?;
        let snapshots = query
            .order_by_desc(snapshot::Column::CreatedAt)
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok((snapshots.into_iter().map(SnapshotResponse::from).collect(), total))
    }

    /// For every configuration, the newest snapshot taken at or before `date`,
    /// falling back to the oldest one taken after it.
    ///
    /// Configurations without any readable snapshot are skipped.
    pub async fn fetch_by_date_and_repository(
        &self,
        org_id: &str,
        repository_configuration_uuids: &[Uuid],
        date: DateTime<Utc>,
    ) -> Result<Vec<snapshot::Model>, DaoError> {
        let readable = self.readable(org_id);
        let date = date.fixed_offset();
        let mut snapshots = Vec::with_capacity(repository_configuration_uuids.len());

        for uuid in repository_configuration_uuids {
            let for_config = readable
                .select()
                .filter(snapshot::Column::RepositoryConfigurationUuid.eq(*uuid));

            let before = for_config
                .clone()
                .filter(snapshot::Column::CreatedAt.lte(date))
                .order_by_desc(snapshot::Column::CreatedAt)
                .one(&self.db)
                .await?;

            let found = match before {
                Some(snapshot) => Some(snapshot),
                None => {
                    for_config
                        .filter(snapshot::Column::CreatedAt.gt(date))
                        .order_by_asc(snapshot::Column::CreatedAt)
                        .one(&self.db)
                        .await?
                }
            };

            if let Some(snapshot) = found {
                snapshots.push(snapshot);
            }
        }

        Ok(snapshots)
    }
}
