//! # Template DAO
//!
//! Templates pin repository configurations to a date (or to their latest
//! snapshots). Writes that touch the pinned set run inside one transaction and
//! go through [`diff_repository_uuids`] so only the changed pins are written.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::api::Page;
use crate::api::templates::{
    TemplateFilters, TemplateRequest, TemplateResponse, TemplateUpdateRequest,
};
use crate::config::CatalogPolicy;
use crate::dao::sort_order;
use crate::dao::template_diff::{RepositoryChanges, diff_repository_uuids};
use crate::error::{DaoError, is_unique_violation};
use crate::models::{repository_configuration, template, template_repository_configuration};

const DUPLICATE_NAME_MESSAGE: &str = "Template with this name already belongs to organization";
const DATE_AND_USE_LATEST_MESSAGE: &str = "Date cannot be set when use_latest is true";

fn not_found(template_uuid: Uuid) -> DaoError {
    DaoError::not_found(format!("Could not find template with UUID {template_uuid}"))
}

fn map_write_error(err: DbErr) -> DaoError {
    if is_unique_violation(&err) {
        DaoError::bad_validation(DUPLICATE_NAME_MESSAGE)
    } else {
        DaoError::Database(err)
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, DaoError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DaoError::bad_validation(format!("{field} is required")))
}

#[derive(Clone)]
pub struct TemplateDao {
    db: DatabaseConnection,
    policy: Arc<CatalogPolicy>,
}

impl TemplateDao {
    pub fn new(db: DatabaseConnection, policy: Arc<CatalogPolicy>) -> Self {
        Self { db, policy }
    }

    /// Fails with `NotFound` for the first uuid that is not a live configuration
    /// owned by `org_id` or the curated organization.
    async fn ensure_configurations<C: ConnectionTrait>(
        &self,
        db: &C,
        org_id: &str,
        uuids: &[Uuid],
    ) -> Result<(), DaoError> {
        if uuids.is_empty() {
            return Ok(());
        }

        let found: HashSet<Uuid> = repository_configuration::Entity::find()
            .select_only()
            .column(repository_configuration::Column::Uuid)
            .filter(repository_configuration::Column::Uuid.is_in(uuids.iter().copied()))
            .filter(
                repository_configuration::Column::OrgId
                    .is_in([org_id.to_string(), self.policy.red_hat_org_id.clone()]),
            )
            .filter(repository_configuration::Column::DeletedAt.is_null())
            .into_tuple::<Uuid>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        match uuids.iter().find(|uuid| !found.contains(uuid)) {
            Some(missing) => Err(DaoError::not_found(format!(
                "Could not find repository with UUID {missing}"
            ))),
            None => Ok(()),
        }
    }

    async fn pinned_uuids<C: ConnectionTrait>(
        db: &C,
        template_uuid: Uuid,
    ) -> Result<Vec<Uuid>, DbErr> {
        template_repository_configuration::Entity::find()
            .select_only()
            .column(template_repository_configuration::Column::RepositoryConfigurationUuid)
            .filter(template_repository_configuration::Column::TemplateUuid.eq(template_uuid))
            .into_tuple()
            .all(db)
            .await
    }

    async fn pin<C: ConnectionTrait>(
        db: &C,
        template_uuid: Uuid,
        configuration_uuids: &[Uuid],
    ) -> Result<(), DbErr> {
        if configuration_uuids.is_empty() {
            return Ok(());
        }

        let rows = configuration_uuids.iter().map(|uuid| {
            template_repository_configuration::ActiveModel {
                template_uuid: Set(template_uuid),
                repository_configuration_uuid: Set(*uuid),
                distribution_href: Set(None),
            }
        });

        template_repository_configuration::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    template_repository_configuration::Column::TemplateUuid,
                    template_repository_configuration::Column::RepositoryConfigurationUuid,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }

    pub async fn create(&self, request: TemplateRequest) -> Result<TemplateResponse, DaoError> {
        let org_id = required(request.org_id, "org_id")?;
        let name = required(request.name, "name")?;
        let arch = required(request.arch, "arch")?;
        let version = required(request.version, "version")?;
        let use_latest = request.use_latest.unwrap_or(false);
        if use_latest && request.date.is_some() {
            return Err(DaoError::bad_validation(DATE_AND_USE_LATEST_MESSAGE));
        }

        let mut repository_uuids = request.repository_uuids;
        let mut seen = HashSet::new();
        repository_uuids.retain(|uuid| seen.insert(*uuid));

        let txn = self.db.begin().await?;
        self.ensure_configurations(&txn, &org_id, &repository_uuids)
            .await?;

        let now = Utc::now().fixed_offset();
        let model = template::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            org_id: Set(org_id),
            name: Set(name),
            description: Set(request.description.unwrap_or_default()),
            arch: Set(arch),
            version: Set(version),
            date: Set(request.date.map(|d| d.fixed_offset())),
            use_latest: Set(use_latest),
            created_by: Set(request.user.clone()),
            last_updated_by: Set(request.user),
            last_update_task_uuid: Set(None),
            last_update_snapshot_error: Set(None),
            rhsm_environment_created: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(map_write_error)?;

        Self::pin(&txn, model.uuid, &repository_uuids).await?;
        txn.commit().await?;

        info!(
            template_uuid = %model.uuid,
            org_id = %model.org_id,
            repositories = repository_uuids.len(),
            "Created template"
        );

        Ok(TemplateResponse::from_model(model, repository_uuids))
    }

    async fn find_model<C: ConnectionTrait>(
        db: &C,
        org_id: &str,
        template_uuid: Uuid,
        include_soft_deleted: bool,
    ) -> Result<template::Model, DaoError> {
        template::Entity::find_by_id(template_uuid)
            .filter(template::Column::OrgId.eq(org_id))
            .apply_if((!include_soft_deleted).then_some(()), |query, _| {
                query.filter(template::Column::DeletedAt.is_null())
            })
            .one(db)
            .await?
            .ok_or_else(|| not_found(template_uuid))
    }

    pub async fn fetch(
        &self,
        org_id: &str,
        template_uuid: Uuid,
        include_soft_deleted: bool,
    ) -> Result<TemplateResponse, DaoError> {
        let model = Self::find_model(&self.db, org_id, template_uuid, include_soft_deleted).await?;
        let pinned = Self::pinned_uuids(&self.db, template_uuid).await?;
        Ok(TemplateResponse::from_model(model, pinned))
    }

    pub async fn list(
        &self,
        org_id: &str,
        include_soft_deleted: bool,
        page: &Page,
        filters: &TemplateFilters,
    ) -> Result<(Vec<TemplateResponse>, u64), DaoError> {
        let mut query = template::Entity::find().filter(template::Column::OrgId.eq(org_id));

        if !include_soft_deleted {
            query = query.filter(template::Column::DeletedAt.is_null());
        }
        if let Some(name) = filters.name.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(template::Column::Name.eq(name));
        }
        if let Some(version) = filters.version.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(template::Column::Version.eq(version));
        }
        if let Some(arch) = filters.arch.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(template::Column::Arch.eq(arch));
        }
        if let Some(search) = filters.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(template::Column::Name.contains(search));
        }
        if !filters.repository_uuids.is_empty() {
            let pinning = template_repository_configuration::Entity::find()
                .select_only()
                .column(template_repository_configuration::Column::TemplateUuid)
                .filter(
                    template_repository_configuration::Column::RepositoryConfigurationUuid
                        .is_in(filters.repository_uuids.iter().copied()),
                )
                .into_query();
            query = query.filter(template::Column::Uuid.in_subquery(pinning));
        }

        let total = query.clone().count(&self.db).await?;

        let orders = sort_order(
            page.sort_by.as_deref(),
            &[
                ("name", template::Column::Name),
                ("version", template::Column::Version),
                ("arch", template::Column::Arch),
                ("created_at", template::Column::CreatedAt),
            ],
            (template::Column::Name, sea_orm::Order::Asc),
        );
        for (column, order) in orders {
            query = query.order_by(column, order);
        }

        let templates = query
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        let uuids: Vec<Uuid> = templates.iter().map(|t| t.uuid).collect();
        let mut pins: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        if !uuids.is_empty() {
            let rows = template_repository_configuration::Entity::find()
                .filter(template_repository_configuration::Column::TemplateUuid.is_in(uuids))
                .all(&self.db)
                .await?;
            for row in rows {
                pins.entry(row.template_uuid)
                    .or_default()
                    .push(row.repository_configuration_uuid);
            }
        }

        let responses = templates
            .into_iter()
            .map(|model| {
                let pinned = pins.remove(&model.uuid).unwrap_or_default();
                TemplateResponse::from_model(model, pinned)
            })
            .collect();

        Ok((responses, total))
    }

    /// Applies a partial update. Replacing the repository list only writes
    /// the pins that changed.
    pub async fn update(
        &self,
        org_id: &str,
        template_uuid: Uuid,
        request: TemplateUpdateRequest,
    ) -> Result<TemplateResponse, DaoError> {
        let txn = self.db.begin().await?;
        let existing = Self::find_model(&txn, org_id, template_uuid, false).await?;

        let use_latest = request.use_latest.unwrap_or(existing.use_latest);
        let date = match request.date {
            Some(date) => date.map(|d| d.fixed_offset()),
            None if request.use_latest == Some(true) => None,
            None => existing.date,
        };
        if use_latest && date.is_some() {
            return Err(DaoError::bad_validation(DATE_AND_USE_LATEST_MESSAGE));
        }

        let mut active: template::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(required(Some(name), "name")?);
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(arch) = request.arch {
            active.arch = Set(required(Some(arch), "arch")?);
        }
        if let Some(version) = request.version {
            active.version = Set(required(Some(version), "version")?);
        }
        if let Some(user) = request.user {
            active.last_updated_by = Set(Some(user));
        }
        active.use_latest = Set(use_latest);
        active.date = Set(date);
        active.updated_at = Set(Utc::now().fixed_offset());

        let model = active.update(&txn).await.map_err(map_write_error)?;

        if let Some(requested) = request.repository_uuids {
            self.ensure_configurations(&txn, org_id, &requested).await?;

            let pinned = Self::pinned_uuids(&txn, template_uuid).await?;
            let changes = diff_repository_uuids(&pinned, &requested);

            if !changes.removed.is_empty() {
                template_repository_configuration::Entity::delete_many()
                    .filter(
                        template_repository_configuration::Column::TemplateUuid.eq(template_uuid),
                    )
                    .filter(
                        template_repository_configuration::Column::RepositoryConfigurationUuid
                            .is_in(changes.removed.iter().copied()),
                    )
                    .exec(&txn)
                    .await?;
            }
            Self::pin(&txn, template_uuid, &changes.added).await?;

            info!(
                template_uuid = %template_uuid,
                added = changes.added.len(),
                removed = changes.removed.len(),
                "Updated template repositories"
            );
        }

        let pinned = Self::pinned_uuids(&txn, template_uuid).await?;
        txn.commit().await?;

        Ok(TemplateResponse::from_model(model, pinned))
    }

    pub async fn soft_delete(&self, org_id: &str, template_uuid: Uuid) -> Result<(), DaoError> {
        let now = Utc::now().fixed_offset();
        let result = template::Entity::update_many()
            .col_expr(template::Column::DeletedAt, Expr::value(now))
            .col_expr(template::Column::UpdatedAt, Expr::value(now))
            .filter(template::Column::Uuid.eq(template_uuid))
            .filter(template::Column::OrgId.eq(org_id))
            .filter(template::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(not_found(template_uuid));
        }
        info!(template_uuid = %template_uuid, org_id, "Soft-deleted template");
        Ok(())
    }

    /// Removes the template row and its pins, whether or not it was soft-deleted.
    pub async fn delete(&self, org_id: &str, template_uuid: Uuid) -> Result<(), DaoError> {
        let txn = self.db.begin().await?;
        Self::find_model(&txn, org_id, template_uuid, true).await?;

        template_repository_configuration::Entity::delete_many()
            .filter(template_repository_configuration::Column::TemplateUuid.eq(template_uuid))
            .exec(&txn)
            .await?;
        template::Entity::delete_by_id(template_uuid)
            .exec(&txn)
            .await?;

        txn.commit().await?;
        info!(template_uuid = %template_uuid, org_id, "Deleted template");
        Ok(())
    }

    pub async fn clear_deleted_at(&self, org_id: &str, template_uuid: Uuid) -> Result<(), DaoError> {
        let result = template::Entity::update_many()
            .col_expr(
                template::Column::DeletedAt,
                Expr::value(Option::<sea_orm::prelude::DateTimeWithTimeZone>::None),
            )
            .filter(template::Column::Uuid.eq(template_uuid))
            .filter(template::Column::OrgId.eq(org_id))
            .exec(&self.db)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected == 0 {
            return Err(not_found(template_uuid));
        }
        Ok(())
    }

    /// Diff between the template's pinned configurations and `new_uuids`.
    pub async fn get_repo_changes(
        &self,
        template_uuid: Uuid,
        new_uuids: &[Uuid],
    ) -> Result<RepositoryChanges, DaoError> {
        let pinned = Self::pinned_uuids(&self.db, template_uuid).await?;
        Ok(diff_repository_uuids(&pinned, new_uuids))
    }

    /// Replaces the template's pins with `repository_uuids`, recording the
    /// distribution serving each one.
    pub async fn update_distribution_hrefs(
        &self,
        template_uuid: Uuid,
        repository_uuids: &[Uuid],
        hrefs: &HashMap<Uuid, String>,
    ) -> Result<(), DaoError> {
        let txn = self.db.begin().await?;

        template_repository_configuration::Entity::delete_many()
            .filter(template_repository_configuration::Column::TemplateUuid.eq(template_uuid))
            .exec(&txn)
            .await?;

        if !repository_uuids.is_empty() {
            let mut seen = HashSet::new();
            let rows = repository_uuids
                .iter()
                .filter(|uuid| seen.insert(**uuid))
                .map(|uuid| template_repository_configuration::ActiveModel {
                    template_uuid: Set(template_uuid),
                    repository_configuration_uuid: Set(*uuid),
                    distribution_href: Set(hrefs.get(uuid).cloned()),
                });
            template_repository_configuration::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    pub async fn update_last_update_task(
        &self,
        template_uuid: Uuid,
        task_uuid: &str,
    ) -> Result<(), DaoError> {
        template::Entity::update_many()
            .col_expr(
                template::Column::LastUpdateTaskUuid,
                Expr::value(task_uuid.to_string()),
            )
            .filter(template::Column::Uuid.eq(template_uuid))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn update_last_error(
        &self,
        org_id: &str,
        template_uuid: Uuid,
        error: &str,
    ) -> Result<(), DaoError> {
        template::Entity::update_many()
            .col_expr(
                template::Column::LastUpdateSnapshotError,
                Expr::value(error.to_string()),
            )
            .filter(template::Column::Uuid.eq(template_uuid))
            .filter(template::Column::OrgId.eq(org_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn set_environment_created(&self, template_uuid: Uuid) -> Result<(), DaoError> {
        template::Entity::update_many()
            .col_expr(template::Column::RhsmEnvironmentCreated, Expr::value(true))
            .filter(template::Column::Uuid.eq(template_uuid))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
