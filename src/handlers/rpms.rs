//! # Package Endpoints
//!
//! Repository package listings, cross-repository name search and presence
//! detection, plus the snapshot package and errata listings backed by the
//! content index.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    response::Json,
};
use uuid::Uuid;

use crate::api::CollectionResponse;
use crate::api::errata::{ErrataQuery, SnapshotErrata};
use crate::api::rpms::{
    ContentUnitSearchRequest, DetectRpmsRequest, DetectRpmsResponse, RepositoryRpm,
    RepositoryRpmQuery, SearchRpmResponse, SnapshotRpm, SnapshotRpmQuery,
    SnapshotSearchRpmRequest,
};
use crate::api::split_comma_list;
use crate::auth::{OrgContext, OrgHeaders};
use crate::clients::ErrataFilters;
use crate::error::ApiError;
use crate::handlers::page_from;
use crate::server::{API_PREFIX, AppState};

pub(crate) fn errata_filters(query: &ErrataQuery) -> ErrataFilters {
    ErrataFilters {
        search: query.search.clone().unwrap_or_default(),
        types: split_comma_list(query.errata_type.as_deref()),
        severities: split_comma_list(query.severity.as_deref()),
    }
}

/// List the packages of a repository configuration
#[utoipa::path(
    get,
    path = "/api/content-sources/v1/repositories/{uuid}/rpms",
    params(
        ("uuid" = Uuid, Path, description = "Repository configuration UUID"),
        RepositoryRpmQuery,
        OrgHeaders
    ),
    responses(
        (status = 200, description = "Packages listed", body = CollectionResponse<RepositoryRpm>),
        (status = 400, description = "Missing organization header", body = ApiError),
        (status = 404, description = "Repository not found", body = ApiError)
    ),
    tag = "rpms"
)]
pub async fn list_repository_rpms(
    State(state): State<AppState>,
    org: OrgContext,
    Path(uuid): Path<Uuid>,
    Query(query): Query<RepositoryRpmQuery>,
) -> Result<Json<CollectionResponse<RepositoryRpm>>, ApiError> {
    let page = page_from(query.limit, query.offset, query.sort_by.clone());
    let (rpms, total) = state
        .daos
        .rpms()
        .list(&org.org_id, uuid, query.search.as_deref(), &page)
        .await?;

    let path = format!("{API_PREFIX}/repositories/{uuid}/rpms");
    Ok(Json(CollectionResponse::new(rpms, &path, &page, total)))
}

/// Search package names across repositories
#[utoipa::path(
    post,
    path = "/api/content-sources/v1/rpms/names",
    params(OrgHeaders),
    request_body = ContentUnitSearchRequest,
    responses(
        (status = 200, description = "Matching package names", body = Vec<SearchRpmResponse>),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Repository not found", body = ApiError)
    ),
    tag = "rpms"
)]
pub async fn search_rpms(
    State(state): State<AppState>,
    org: OrgContext,
    payload: Result<Json<ContentUnitSearchRequest>, JsonRejection>,
) -> Result<Json<Vec<SearchRpmResponse>>, ApiError> {
    let Json(request) = payload?;
    let results = state.daos.rpms().search(&org.org_id, request).await?;
    Ok(Json(results))
}

/// Detect which package names are present in repositories
#[utoipa::path(
    post,
    path = "/api/content-sources/v1/rpms/presence",
    params(OrgHeaders),
    request_body = DetectRpmsRequest,
    responses(
        (status = 200, description = "Found and missing package names", body = DetectRpmsResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Repository not found", body = ApiError)
    ),
    tag = "rpms"
)]
pub async fn detect_rpms(
    State(state): State<AppState>,
    org: OrgContext,
    payload: Result<Json<DetectRpmsRequest>, JsonRejection>,
) -> Result<Json<DetectRpmsResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.daos.rpms().detect(&org.org_id, request).await?;
    Ok(Json(response))
}

/// Search package names inside snapshots
#[utoipa::path(
    post,
    path = "/api/content-sources/v1/snapshots/rpms/names",
    params(OrgHeaders),
    request_body = SnapshotSearchRpmRequest,
    responses(
        (status = 200, description = "Matching package names", body = Vec<SearchRpmResponse>),
        (status = 404, description = "Snapshot not found", body = ApiError)
    ),
    tag = "snapshots"
)]
pub async fn search_snapshot_rpms(
    State(state): State<AppState>,
    org: OrgContext,
    payload: Result<Json<SnapshotSearchRpmRequest>, JsonRejection>,
) -> Result<Json<Vec<SearchRpmResponse>>, ApiError> {
    let Json(request) = payload?;
    let results = state
        .daos
        .rpms()
        .search_snapshot_rpms(&org.org_id, request)
        .await?;
    Ok(Json(results))
}

/// List the packages in a snapshot
#[utoipa::path(
    get,
    path = "/api/content-sources/v1/snapshots/{uuid}/rpms",
    params(
        ("uuid" = Uuid, Path, description = "Snapshot UUID"),
        SnapshotRpmQuery,
        OrgHeaders
    ),
    responses(
        (status = 200, description = "Packages listed", body = CollectionResponse<SnapshotRpm>),
        (status = 404, description = "Snapshot not found", body = ApiError)
    ),
    tag = "snapshots"
)]
pub async fn list_snapshot_rpms(
    State(state): State<AppState>,
    org: OrgContext,
    Path(uuid): Path<Uuid>,
    Query(query): Query<SnapshotRpmQuery>,
) -> Result<Json<CollectionResponse<SnapshotRpm>>, ApiError> {
    let page = page_from(query.limit, query.offset, None);
    let (rpms, total) = state
        .daos
        .rpms()
        .list_snapshot_rpms(
            &org.org_id,
            &[uuid],
            query.search.as_deref().unwrap_or_default(),
            &page,
        )
        .await?;

    let path = format!("{API_PREFIX}/snapshots/{uuid}/rpms");
    Ok(Json(CollectionResponse::new(rpms, &path, &page, total)))
}

/// List the errata in a snapshot
#[utoipa::path(
    get,
    path = "/api/content-sources/v1/snapshots/{uuid}/errata",
    params(
        ("uuid" = Uuid, Path, description = "Snapshot UUID"),
        ErrataQuery,
        OrgHeaders
    ),
    responses(
        (status = 200, description = "Errata listed", body = CollectionResponse<SnapshotErrata>),
        (status = 404, description = "Snapshot not found", body = ApiError)
    ),
    tag = "snapshots"
)]
pub async fn list_snapshot_errata(
    State(state): State<AppState>,
    org: OrgContext,
    Path(uuid): Path<Uuid>,
    Query(query): Query<ErrataQuery>,
) -> Result<Json<CollectionResponse<SnapshotErrata>>, ApiError> {
    let page = page_from(query.limit, query.offset, query.sort_by.clone());
    let (errata, total) = state
        .daos
        .rpms()
        .list_snapshot_errata(&org.org_id, &[uuid], &errata_filters(&query), &page)
        .await?;

    let path = format!("{API_PREFIX}/snapshots/{uuid}/errata");
    Ok(Json(CollectionResponse::new(errata, &path, &page, total)))
}
