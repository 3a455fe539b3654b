//! # Package DAO
//!
//! Listing, searching and ingesting packages. Reads are scoped through
//! [`ReadableRepositories`] and [`ReadableSnapshots`]; ingestion runs the
//! checksum deduplicator followed by the association reconciler.
//!
//! Snapshot and template content lives in the external content index, so those
//! listings resolve snapshots locally and forward their version hrefs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::Page;
use crate::api::errata::SnapshotErrata;
use crate::api::rpms::{
    ContentUnitSearchRequest, DetectRpmsRequest, DetectRpmsResponse, PackageSourcesResponse,
    RepositoryRpm, SEARCH_LIMIT_DEFAULT, SEARCH_LIMIT_MAXIMUM, SearchRpmResponse, SnapshotRpm,
    SnapshotSearchRpmRequest,
};
use crate::clients::{AppstreamEntity, ClientError, ContentIndex, ErrataFilters, RoadmapClient};
use crate::config::CatalogPolicy;
use crate::dao::checksums::{batch_ranges, existing_checksums, filter_new_packages};
use crate::dao::orphans::{grace_window, sweep_packages};
use crate::dao::reconcile::{ReconcileLimits, reconcile_associations};
use crate::dao::snapshots::SnapshotDao;
use crate::dao::sort_order;
use crate::dao::visibility::{ReadableRepositories, ReadableSnapshots, VisibilityPolicy};
use crate::error::DaoError;
use crate::models::{
    module_stream, repository, repository_configuration, repository_module_stream,
    repository_rpm, rpm, snapshot, template, template_repository_configuration,
};

/// Implementation kind of roadmap entries that describe module streams
const DNF_MODULE_KIND: &str = "dnf_module";

/// One package from a repository listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInput {
    pub name: String,
    pub arch: String,
    pub version: String,
    pub release: String,
    pub epoch: i32,
    pub checksum: String,
    pub summary: String,
}

/// Work done by [`RpmDao::insert_for_repository`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Package rows created
    pub inserted: u64,
    pub associations_added: u64,
    pub associations_removed: u64,
    /// Existence queries issued by the deduplicator
    pub existence_queries: usize,
}

#[derive(Debug, FromQueryResult)]
struct NameSummary {
    package_name: String,
    summary: String,
}

#[derive(Clone)]
pub struct RpmDao {
    db: DatabaseConnection,
    policy: Arc<CatalogPolicy>,
    content_index: Option<Arc<dyn ContentIndex>>,
    roadmap: Option<Arc<dyn RoadmapClient>>,
}

fn unexpected(err: DbErr) -> DaoError {
    DaoError::Unexpected(err.to_string())
}

fn search_limit(requested: Option<u64>) -> u64 {
    match requested {
        None | Some(0) => SEARCH_LIMIT_DEFAULT,
        Some(limit) => limit.min(SEARCH_LIMIT_MAXIMUM),
    }
}

impl RpmDao {
    pub fn new(
        db: DatabaseConnection,
        policy: Arc<CatalogPolicy>,
        content_index: Option<Arc<dyn ContentIndex>>,
        roadmap: Option<Arc<dyn RoadmapClient>>,
    ) -> Self {
        Self {
            db,
            policy,
            content_index,
            roadmap,
        }
    }

    fn visibility(&self) -> VisibilityPolicy {
        VisibilityPolicy::from(self.policy.as_ref())
    }

    fn content_index(&self) -> Result<&Arc<dyn ContentIndex>, DaoError> {
        self.content_index
            .as_ref()
            .ok_or_else(|| ClientError::NotConfigured("content index").into())
    }

    /// Packages of one repository configuration visible to `org_id`.
    pub async fn list(
        &self,
        org_id: &str,
        repository_configuration_uuid: Uuid,
        search: Option<&str>,
        page: &Page,
    ) -> Result<(Vec<RepositoryRpm>, u64), DaoError> {
        let configuration = repository_configuration::Entity::find_by_id(
            repository_configuration_uuid,
        )
        .filter(
            repository_configuration::Column::OrgId
                .is_in([org_id.to_string(), self.policy.red_hat_org_id.clone()]),
        )
        .filter(repository_configuration::Column::DeletedAt.is_null())
        .one(&self.db)
        .await?
        .ok_or_else(|| {
            DaoError::not_found(format!(
                "Could not find repository with UUID {repository_configuration_uuid}"
            ))
        })?;

        let mut query = rpm::Entity::find()
            .join(JoinType::InnerJoin, rpm::Relation::RepositoryRpms.def())
            .filter(repository_rpm::Column::RepositoryUuid.eq(configuration.repository_uuid));

        if let Some(search) = search.filter(|s| !s.is_empty()) {
            query = query.filter(rpm::Column::Name.contains(search));
        }

        let total = query.clone().count(&self.db).await?;

        let orders = sort_order(
            page.sort_by.as_deref(),
            &[
                ("name", rpm::Column::Name),
                ("release", rpm::Column::Release),
                ("version", rpm::Column::Version),
                ("arch", rpm::Column::Arch),
            ],
            (rpm::Column::Name, sea_orm::Order::Asc),
        );
        for (column, order) in orders {
            query = query.order_by(column, order);
        }

        let rpms = query
            .offset(page.offset)
            .limit(page.limit)
            .all(&self.db)
            .await?;

        Ok((rpms.into_iter().map(RepositoryRpm::from).collect(), total))
    }

    /// Distinct package names in the requested readable repositories.
    pub async fn search(
        &self,
        org_id: &str,
        request: ContentUnitSearchRequest,
    ) -> Result<Vec<SearchRpmResponse>, DaoError> {
        if request.urls.is_empty() && request.uuids.is_empty() {
            return Err(DaoError::bad_validation(
                "must contain at least 1 URL or 1 UUID",
            ));
        }
        let limit = search_limit(request.limit);

        let repository_uuids = ReadableRepositories::new(org_id, self.visibility())
            .with_urls(&request.urls)
            .with_uuids(&request.uuids)
            .resolve_requested(&self.db)
            .await?;

        if repository_uuids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = rpm::Entity::find()
            .select_only()
            .column_as(rpm::Column::Name, "package_name")
            .column_as(Expr::col((rpm::Entity, rpm::Column::Summary)).max(), "summary")
            .join(JoinType::InnerJoin, rpm::Relation::RepositoryRpms.def())
            .filter(repository_rpm::Column::RepositoryUuid.is_in(repository_uuids.iter().copied()));

        if !request.exact_names.is_empty() {
            query = query.filter(rpm::Column::Name.is_in(request.exact_names.iter().cloned()));
        } else {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((rpm::Entity, rpm::Column::Name))))
                    .like(format!("{}%", request.search.to_lowercase())),
            );
        }

        let rows = query
            .group_by(rpm::Column::Name)
            .order_by_asc(rpm::Column::Name)
            .limit(limit)
            .into_model::<NameSummary>()
            .all(&self.db)
            .await?;

        let mut response: Vec<SearchRpmResponse> = rows
            .into_iter()
            .map(|row| SearchRpmResponse {
                package_name: row.package_name,
                summary: row.summary,
                package_sources: Vec::new(),
            })
            .collect();

        if request.include_package_sources && !response.is_empty() {
            self.add_package_sources(&mut response, &repository_uuids)
                .await?;
        }

        Ok(response)
    }

    /// Which of the requested package names exist in the requested repositories.
    pub async fn detect(
        &self,
        org_id: &str,
        request: DetectRpmsRequest,
    ) -> Result<DetectRpmsResponse, DaoError> {
        if request.urls.is_empty() && request.uuids.is_empty() {
            return Err(DaoError::bad_validation(
                "must contain at least 1 URL or 1 UUID",
            ));
        }
        let limit = match request.limit {
            None | Some(0) => SEARCH_LIMIT_DEFAULT,
            Some(limit) if limit > SEARCH_LIMIT_MAXIMUM => {
                return Err(DaoError::bad_validation("Limit cannot be more than 500"));
            }
            Some(limit) => limit,
        };

        let readable = ReadableRepositories::new(org_id, self.visibility())
            .with_urls(&request.urls)
            .with_uuids(&request.uuids);
        readable.resolve_requested(&self.db).await?;

        let found: Vec<String> = if request.rpm_names.is_empty() {
            Vec::new()
        } else {
            rpm::Entity::find()
                .select_only()
                .column(rpm::Column::Name)
                .distinct()
                .join(JoinType::InnerJoin, rpm::Relation::RepositoryRpms.def())
                .filter(repository_rpm::Column::RepositoryUuid.in_subquery(readable.subquery()))
                .filter(rpm::Column::Name.is_in(request.rpm_names.iter().cloned()))
                .order_by_asc(rpm::Column::Name)
                .limit(limit)
                .into_tuple()
                .all(&self.db)
                .await?
        };

        let found_set: HashSet<&str> = found.iter().map(String::as_str).collect();
        let missing = request
            .rpm_names
            .iter()
            .filter(|name| !found_set.contains(name.as_str()))
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(DetectRpmsResponse { found, missing })
    }

    /// Stores a repository's latest package listing.
    ///
    /// New checksums become package rows; the repository's association set is
    /// then made to equal the listing.
    pub async fn insert_for_repository(
        &self,
        repository_uuid: Uuid,
        packages: &[PackageInput],
    ) -> Result<IngestReport, DaoError> {
        let exists = repository::Entity::find_by_id(repository_uuid)
            .one(&self.db)
            .await?
            .is_some();
        if !exists {
            return Err(DaoError::not_found(format!(
                "Could not find repository with UUID {repository_uuid}"
            )));
        }

        let in_clause_limit = self.policy.in_clause_limit;
        let checksums: Vec<String> = packages.iter().map(|p| p.checksum.clone()).collect();

        let lookup = existing_checksums(&self.db, &checksums, in_clause_limit)
            .await
            .map_err(unexpected)?;
        let new_packages = filter_new_packages(packages, &lookup.found);

        let mut report = IngestReport {
            existence_queries: lookup.batches,
            ..Default::default()
        };

        let now = Utc::now().fixed_offset();
        for range in batch_ranges(new_packages.len(), self.policy.insert_batch_size) {
            let rows = new_packages[range].iter().map(|package| rpm::ActiveModel {
                uuid: Set(Uuid::new_v4()),
                checksum: Set(package.checksum.clone()),
                name: Set(package.name.clone()),
                arch: Set(package.arch.clone()),
                version: Set(package.version.clone()),
                release: Set(package.release.clone()),
                epoch: Set(package.epoch),
                summary: Set(package.summary.clone()),
                created_at: Set(now),
            });

            report.inserted += rpm::Entity::insert_many(rows)
                .on_conflict(
                    OnConflict::column(rpm::Column::Checksum)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await
                .map_err(unexpected)?;
        }

        let mut desired = Vec::with_capacity(checksums.len());
        for range in batch_ranges(checksums.len(), in_clause_limit) {
            let uuids: Vec<Uuid> = rpm::Entity::find()
                .select_only()
                .column(rpm::Column::Uuid)
                .filter(rpm::Column::Checksum.is_in(checksums[range].iter().cloned()))
                .into_tuple()
                .all(&self.db)
                .await
                .map_err(unexpected)?;
            desired.extend(uuids);
        }

        let outcome = reconcile_associations(
            &self.db,
            repository_uuid,
            &desired,
            ReconcileLimits {
                in_clause_limit,
                insert_batch_size: self.policy.insert_batch_size,
            },
        )
        .await
        .map_err(unexpected)?;

        report.associations_added = outcome.added;
        report.associations_removed = outcome.removed;

        info!(
            repository_uuid = %repository_uuid,
            packages = packages.len(),
            inserted = report.inserted,
            associations_added = report.associations_added,
            associations_removed = report.associations_removed,
            existence_queries = report.existence_queries,
            "Ingested repository package listing"
        );

        Ok(report)
    }

    /// Deletes packages no repository references once they are older than
    /// the policy's package grace window.
    pub async fn orphan_cleanup(&self) -> Result<u64, DaoError> {
        let grace = grace_window(self.policy.orphan_package_grace_seconds);
        let deleted = sweep_packages(&self.db, grace).await?;
        debug!(deleted, "Removed orphaned packages");
        Ok(deleted)
    }

    /// Package names inside snapshots, from the content index.
    pub async fn search_snapshot_rpms(
        &self,
        org_id: &str,
        request: SnapshotSearchRpmRequest,
    ) -> Result<Vec<SearchRpmResponse>, DaoError> {
        let snapshots = self.readable_snapshots(org_id, &request.uuids).await?;
        let index = self.content_index()?;

        let hrefs = version_hrefs(&snapshots);
        if hrefs.is_empty() {
            return Ok(Vec::new());
        }

        let hits = index
            .search_packages(&hrefs, &request.search, search_limit(request.limit))
            .await?;

        let mut response: Vec<SearchRpmResponse> = hits
            .into_iter()
            .map(|hit| SearchRpmResponse {
                package_name: hit.name,
                summary: hit.summary,
                package_sources: Vec::new(),
            })
            .collect();

        if request.include_package_sources && !response.is_empty() {
            let configuration_uuids: Vec<Uuid> = snapshots
                .iter()
                .map(|s| s.repository_configuration_uuid)
                .collect();
            let repository_uuids: Vec<Uuid> = repository_configuration::Entity::find()
                .select_only()
                .column(repository_configuration::Column::RepositoryUuid)
                .filter(repository_configuration::Column::Uuid.is_in(configuration_uuids))
                .into_tuple()
                .all(&self.db)
                .await?;
            self.add_package_sources(&mut response, &repository_uuids)
                .await?;
        }

        Ok(response)
    }

    /// One page of packages across the given snapshots.
    pub async fn list_snapshot_rpms(
        &self,
        org_id: &str,
        snapshot_uuids: &[Uuid],
        search: &str,
        page: &Page,
    ) -> Result<(Vec<SnapshotRpm>, u64), DaoError> {
        let snapshots = self.readable_snapshots(org_id, snapshot_uuids).await?;
        self.list_packages_in(&snapshots, search, page).await
    }

    /// One page of errata across the given snapshots.
    pub async fn list_snapshot_errata(
        &self,
        org_id: &str,
        snapshot_uuids: &[Uuid],
        filters: &ErrataFilters,
        page: &Page,
    ) -> Result<(Vec<SnapshotErrata>, u64), DaoError> {
        let snapshots = self.readable_snapshots(org_id, snapshot_uuids).await?;
        self.list_errata_in(&snapshots, filters, page).await
    }

    /// Packages of the snapshots a template currently resolves to.
    pub async fn list_template_rpms(
        &self,
        org_id: &str,
        template_uuid: Uuid,
        search: &str,
        page: &Page,
    ) -> Result<(Vec<SnapshotRpm>, u64), DaoError> {
        let snapshots = self.template_snapshots(org_id, template_uuid).await?;
        self.list_packages_in(&snapshots, search, page).await
    }

    /// Errata of the snapshots a template currently resolves to.
    pub async fn list_template_errata(
        &self,
        org_id: &str,
        template_uuid: Uuid,
        filters: &ErrataFilters,
        page: &Page,
    ) -> Result<(Vec<SnapshotErrata>, u64), DaoError> {
        let snapshots = self.template_snapshots(org_id, template_uuid).await?;
        self.list_errata_in(&snapshots, filters, page).await
    }

    async fn readable_snapshots(
        &self,
        org_id: &str,
        snapshot_uuids: &[Uuid],
    ) -> Result<Vec<snapshot::Model>, DaoError> {
        ReadableSnapshots::new(org_id, &self.visibility())
            .resolve(&self.db, snapshot_uuids)
            .await
    }

    async fn template_snapshots(
        &self,
        org_id: &str,
        template_uuid: Uuid,
    ) -> Result<Vec<snapshot::Model>, DaoError> {
        let template = template::Entity::find_by_id(template_uuid)
            .filter(template::Column::OrgId.eq(org_id))
            .filter(template::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                DaoError::not_found(format!("Could not find template with UUID {template_uuid}"))
            })?;

        let configuration_uuids: Vec<Uuid> = template_repository_configuration::Entity::find()
            .select_only()
            .column(template_repository_configuration::Column::RepositoryConfigurationUuid)
            .filter(template_repository_configuration::Column::TemplateUuid.eq(template_uuid))
            .into_tuple()
            .all(&self.db)
            .await?;

        let date = match template.date {
            Some(date) if !template.use_latest => date.with_timezone(&Utc),
            _ => Utc::now(),
        };

        SnapshotDao::new(self.db.clone(), Arc::clone(&self.policy))
            .fetch_by_date_and_repository(org_id, &configuration_uuids, date)
            .await
    }

    async fn list_packages_in(
        &self,
        snapshots: &[snapshot::Model],
        search: &str,
        page: &Page,
    ) -> Result<(Vec<SnapshotRpm>, u64), DaoError> {
        let index = self.content_index()?;
        let hrefs = version_hrefs(snapshots);
        if hrefs.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let (packages, total) = index.list_packages(&hrefs, search, page).await?;
        Ok((packages.into_iter().map(SnapshotRpm::from).collect(), total))
    }

    async fn list_errata_in(
        &self,
        snapshots: &[snapshot::Model],
        filters: &ErrataFilters,
        page: &Page,
    ) -> Result<(Vec<SnapshotErrata>, u64), DaoError> {
        let index = self.content_index()?;
        let hrefs = version_hrefs(snapshots);
        if hrefs.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let (errata, total) = index.list_errata(&hrefs, filters, page).await?;
        Ok((errata.into_iter().map(SnapshotErrata::from).collect(), total))
    }

    async fn add_package_sources(
        &self,
        response: &mut [SearchRpmResponse],
        repository_uuids: &[Uuid],
    ) -> Result<(), DaoError> {
        let streams = module_stream::Entity::find()
            .join(
                JoinType::InnerJoin,
                module_stream::Relation::RepositoryModuleStreams.def(),
            )
            .filter(
                repository_module_stream::Column::RepositoryUuid
                    .is_in(repository_uuids.iter().copied()),
            )
            .all(&self.db)
            .await?;

        let names: Vec<&str> = response.iter().map(|r| r.package_name.as_str()).collect();
        let streams = latest_streams_providing(streams, &names);
        attach_package_sources(response, &streams);

        if let Some(roadmap) = &self.roadmap {
            let appstreams = roadmap.appstreams().await?;
            apply_lifecycle(response, &appstreams);
        }

        Ok(())
    }
}

fn version_hrefs(snapshots: &[snapshot::Model]) -> Vec<String> {
    snapshots.iter().map(|s| s.version_href.clone()).collect()
}

/// Streams providing any of `names`, one per `(name, stream)` keeping the
/// highest version, ordered by name then stream.
fn latest_streams_providing(
    mut streams: Vec<module_stream::Model>,
    names: &[&str],
) -> Vec<module_stream::Model> {
    streams.retain(|stream| names.iter().any(|name| stream.provides(name)));
    streams.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.stream.cmp(&b.stream))
            .then_with(|| b.version.cmp(&a.version))
    });
    streams.dedup_by(|later, earlier| later.name == earlier.name && later.stream == earlier.stream);
    streams
}

fn attach_package_sources(response: &mut [SearchRpmResponse], streams: &[module_stream::Model]) {
    for result in response.iter_mut() {
        let sources: Vec<PackageSourcesResponse> = streams
            .iter()
            .filter(|stream| stream.provides(&result.package_name))
            .map(|stream| PackageSourcesResponse {
                source_type: "module".to_string(),
                name: stream.name.clone(),
                stream: stream.stream.clone(),
                context: stream.context.clone(),
                arch: stream.arch.clone(),
                version: stream.version.clone(),
                description: stream.description.clone(),
                ..Default::default()
            })
            .collect();

        result.package_sources = if sources.is_empty() {
            vec![PackageSourcesResponse::package()]
        } else {
            sources
        };
    }
}

fn apply_lifecycle(response: &mut [SearchRpmResponse], appstreams: &[AppstreamEntity]) {
    let lifecycle: HashMap<(&str, &str), &AppstreamEntity> = appstreams
        .iter()
        .filter(|entity| entity.kind == DNF_MODULE_KIND)
        .map(|entity| ((entity.name.as_str(), entity.stream.as_str()), entity))
        .collect();

    for source in response.iter_mut().flat_map(|r| r.package_sources.iter_mut()) {
        if let Some(entity) = lifecycle.get(&(source.name.as_str(), source.stream.as_str())) {
            source.start_date = entity.start_date.clone();
            source.end_date = entity.end_date.clone();
        }
    }
}
