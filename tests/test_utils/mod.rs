//! Test utilities for database testing.
//!
//! In-memory SQLite catalogs with migrations applied, row fixtures and fake
//! external collaborators.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use content_sources::api::Page;
use content_sources::clients::{
    AppstreamEntity, ClientError, ContentIndex, EntitlementClient, ErrataFilters, ErrataRecord,
    IndexedPackage, PackageHit, RoadmapClient,
};
use content_sources::config::CatalogPolicy;
use content_sources::dao::{DaoRegistry, PackageInput};
use content_sources::models::repository::{IntrospectionStatus, RepositoryOrigin};
use content_sources::models::{
    module_stream, repository, repository_configuration, repository_module_stream, rpm,
    snapshot, template,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, Set};
use serde_json::json;
use uuid::Uuid;

pub const RED_HAT_ORG: &str = "-1";
pub const POPULAR_URL: &str = "https://popular.example.test/repo";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Catalog policy with small batch limits so chunking is exercised.
pub fn test_policy() -> CatalogPolicy {
    CatalogPolicy {
        red_hat_org_id: RED_HAT_ORG.to_string(),
        popular_repository_urls: vec![POPULAR_URL.to_string()],
        in_clause_limit: 500,
        insert_batch_size: 100,
        orphan_retention_days: 7,
        orphan_package_grace_seconds: 0,
        introspect_interval_hours: 24,
        failed_introspections_limit: 20,
    }
}

pub fn registry(db: &DatabaseConnection) -> DaoRegistry {
    DaoRegistry::new(db.clone(), test_policy())
}

/// A fixed whole-second instant, `days` after 2024-01-01.
pub fn day(days: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap() + Duration::days(days)
}

pub async fn insert_repository(
    db: &DatabaseConnection,
    url: &str,
    public: bool,
) -> Result<repository::Model> {
    insert_repository_created_at(db, url, public, Utc::now()).await
}

pub async fn insert_repository_created_at(
    db: &DatabaseConnection,
    url: &str,
    public: bool,
    created_at: DateTime<Utc>,
) -> Result<repository::Model> {
    let created_at = created_at.fixed_offset();
    Ok(repository::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        url: Set(url.to_string()),
        public: Set(public),
        origin: Set(RepositoryOrigin::External),
        status: Set(IntrospectionStatus::Pending),
        last_introspection_time: Set(None),
        last_introspection_success_time: Set(None),
        last_introspection_update_time: Set(None),
        last_introspection_error: Set(None),
        failed_introspections_count: Set(0),
        package_count: Set(0),
        repomd_checksum: Set(String::new()),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
    .insert(db)
    .await?)
}

pub async fn insert_configuration(
    db: &DatabaseConnection,
    org_id: &str,
    repository_uuid: Uuid,
) -> Result<repository_configuration::Model> {
    let now = Utc::now().fixed_offset();
    Ok(repository_configuration::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        name: Set(format!("{org_id}-{repository_uuid}")),
        org_id: Set(org_id.to_string()),
        repository_uuid: Set(repository_uuid),
        versions: Set(Some(json!(["9"]))),
        arch: Set("x86_64".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(db)
    .await?)
}

/// Repository plus one configuration owned by `org_id`.
pub async fn insert_owned_repository(
    db: &DatabaseConnection,
    org_id: &str,
    url: &str,
) -> Result<(repository::Model, repository_configuration::Model)> {
    let repository = insert_repository(db, url, false).await?;
    let configuration = insert_configuration(db, org_id, repository.uuid).await?;
    Ok((repository, configuration))
}

pub async fn soft_delete_configuration(db: &DatabaseConnection, uuid: Uuid) -> Result<()> {
    let model = repository_configuration::Entity::find_by_id(uuid)
        .one(db)
        .await?
        .ok_or_else(|| anyhow::anyhow!("configuration {uuid} missing"))?;
    let mut active: repository_configuration::ActiveModel = model.into();
    active.deleted_at = Set(Some(Utc::now().fixed_offset()));
    active.update(db).await?;
    Ok(())
}

pub async fn insert_snapshot(
    db: &DatabaseConnection,
    repository_configuration_uuid: Uuid,
    created_at: DateTime<Utc>,
) -> Result<snapshot::Model> {
    let uuid = Uuid::new_v4();
    Ok(snapshot::ActiveModel {
        uuid: Set(uuid),
        repository_configuration_uuid: Set(repository_configuration_uuid),
        version_href: Set(format!("/pulp/versions/{uuid}/")),
        publication_href: Set(format!("/pulp/publications/{uuid}/")),
        distribution_path: Set(format!("snapshots/{uuid}")),
        distribution_href: Set(format!("/pulp/distributions/{uuid}/")),
        content_counts: Set(json!({ "rpm.package": 1 })),
        added_counts: Set(json!({})),
        removed_counts: Set(json!({})),
        created_at: Set(created_at.fixed_offset()),
    }
    .insert(db)
    .await?)
}

pub async fn insert_template(
    db: &DatabaseConnection,
    org_id: &str,
    name: &str,
    date: Option<DateTime<Utc>>,
    use_latest: bool,
) -> Result<template::Model> {
    let now = Utc::now().fixed_offset();
    Ok(template::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        org_id: Set(org_id.to_string()),
        name: Set(name.to_string()),
        description: Set(String::new()),
        arch: Set("x86_64".to_string()),
        version: Set("9".to_string()),
        date: Set(date.map(|d| d.fixed_offset())),
        use_latest: Set(use_latest),
        created_by: Set(None),
        last_updated_by: Set(None),
        last_update_task_uuid: Set(None),
        last_update_snapshot_error: Set(None),
        rhsm_environment_created: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(db)
    .await?)
}

/// Module stream shipped by `repository_uuid`.
pub async fn insert_module_stream(
    db: &DatabaseConnection,
    repository_uuid: Uuid,
    name: &str,
    stream: &str,
    version: &str,
    package_names: &[&str],
) -> Result<module_stream::Model> {
    let model = module_stream::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        stream: Set(stream.to_string()),
        version: Set(version.to_string()),
        context: Set("abc123".to_string()),
        arch: Set("x86_64".to_string()),
        description: Set(format!("{name} {stream}")),
        package_names: Set(json!(package_names)),
    }
    .insert(db)
    .await?;

    repository_module_stream::Entity::insert(repository_module_stream::ActiveModel {
        repository_uuid: Set(repository_uuid),
        module_stream_uuid: Set(model.uuid),
    })
    .exec_without_returning(db)
    .await?;

    Ok(model)
}

pub fn package(name: &str, checksum: &str) -> PackageInput {
    PackageInput {
        name: name.to_string(),
        arch: "x86_64".to_string(),
        version: "1.0".to_string(),
        release: "1.el9".to_string(),
        epoch: 0,
        checksum: checksum.to_string(),
        summary: format!("{name} summary"),
    }
}

/// A bare package row with no repository association.
pub async fn insert_rpm_created_at(
    db: &DatabaseConnection,
    checksum: &str,
    created_at: DateTime<Utc>,
) -> Result<rpm::Model> {
    let row = rpm::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        checksum: Set(checksum.to_string()),
        name: Set("unlinked".to_string()),
        arch: Set("x86_64".to_string()),
        version: Set("1.0".to_string()),
        release: Set("1.el9".to_string()),
        epoch: Set(0),
        summary: Set(String::new()),
        created_at: Set(created_at.fixed_offset()),
    };
    Ok(row.insert(db).await?)
}

/// `count` packages named `pkg-<i>` with unique checksums under `prefix`.
pub fn packages(prefix: &str, count: usize) -> Vec<PackageInput> {
    (0..count)
        .map(|i| package(&format!("pkg-{i}"), &format!("{prefix}-{i:08}")))
        .collect()
}

/// Content index that serves canned rows and records the hrefs it was asked for.
#[derive(Default)]
pub struct FakeContentIndex {
    pub packages: Vec<IndexedPackage>,
    pub errata: Vec<ErrataRecord>,
    pub requested_hrefs: Mutex<Vec<Vec<String>>>,
}

impl FakeContentIndex {
    fn record(&self, hrefs: &[String]) {
        let mut sorted = hrefs.to_vec();
        sorted.sort();
        self.requested_hrefs.lock().unwrap().push(sorted);
    }
}

#[async_trait]
impl ContentIndex for FakeContentIndex {
    async fn search_packages(
        &self,
        version_hrefs: &[String],
        search: &str,
        limit: u64,
    ) -> Result<Vec<PackageHit>, ClientError> {
        self.record(version_hrefs);
        let mut hits: Vec<PackageHit> = self
            .packages
            .iter()
            .filter(|p| p.name.starts_with(search))
            .map(|p| PackageHit {
                name: p.name.clone(),
                summary: p.summary.clone(),
            })
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        hits.dedup_by(|a, b| a.name == b.name);
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn list_packages(
        &self,
        version_hrefs: &[String],
        search: &str,
        page: &Page,
    ) -> Result<(Vec<IndexedPackage>, u64), ClientError> {
        self.record(version_hrefs);
        let matching: Vec<IndexedPackage> = self
            .packages
            .iter()
            .filter(|p| p.name.contains(search))
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let page_rows = matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok((page_rows, total))
    }

    async fn list_errata(
        &self,
        version_hrefs: &[String],
        filters: &ErrataFilters,
        _page: &Page,
    ) -> Result<(Vec<ErrataRecord>, u64), ClientError> {
        self.record(version_hrefs);
        let matching: Vec<ErrataRecord> = self
            .errata
            .iter()
            .filter(|e| filters.types.is_empty() || filters.types.contains(&e.errata_type))
            .filter(|e| filters.severities.is_empty() || filters.severities.contains(&e.severity))
            .cloned()
            .collect();
        let total = matching.len() as u64;
        Ok((matching, total))
    }
}

pub fn indexed_package(name: &str) -> IndexedPackage {
    IndexedPackage {
        name: name.to_string(),
        arch: "x86_64".to_string(),
        version: "1.0".to_string(),
        release: "1.el9".to_string(),
        epoch: "0".to_string(),
        summary: format!("{name} summary"),
    }
}

pub struct FakeRoadmap {
    pub appstreams: Vec<AppstreamEntity>,
}

#[async_trait]
impl RoadmapClient for FakeRoadmap {
    async fn appstreams(&self) -> Result<Vec<AppstreamEntity>, ClientError> {
        Ok(self.appstreams.clone())
    }
}

/// Entitlement client that records every promote and demote call.
#[derive(Default)]
pub struct RecordingEntitlements {
    pub promoted: Mutex<Vec<(String, Vec<String>)>>,
    pub demoted: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl EntitlementClient for RecordingEntitlements {
    async fn promote_content(
        &self,
        environment_id: &str,
        content_ids: &[String],
    ) -> Result<(), ClientError> {
        self.promoted
            .lock()
            .unwrap()
            .push((environment_id.to_string(), content_ids.to_vec()));
        Ok(())
    }

    async fn demote_content(
        &self,
        environment_id: &str,
        content_ids: &[String],
    ) -> Result<(), ClientError> {
        self.demoted
            .lock()
            .unwrap()
            .push((environment_id.to_string(), content_ids.to_vec()));
        Ok(())
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
