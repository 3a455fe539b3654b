//! Snapshot listing for a repository configuration.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;

use crate::api::snapshots::SnapshotResponse;
use crate::api::{CollectionResponse, PaginationQuery};
use crate::auth::{OrgContext, OrgHeaders};
use crate::error::ApiError;
use crate::server::{API_PREFIX, AppState};

/// List the snapshots of a repository configuration, newest first
#[utoipa::path(
    get,
    path = "/api/content-sources/v1/repositories/{uuid}/snapshots",
    params(
        ("uuid" = Uuid, Path, description = "Repository configuration UUID"),
        PaginationQuery,
        OrgHeaders
    ),
    responses(
        (status = 200, description = "Snapshots listed", body = CollectionResponse<SnapshotResponse>),
        (status = 404, description = "Repository not found", body = ApiError)
    ),
    tag = "snapshots"
)]
pub async fn list_repository_snapshots(
    State(state): State<AppState>,
    org: OrgContext,
    Path(uuid): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<CollectionResponse<SnapshotResponse>>, ApiError> {
    let page = query.page();
    let (snapshots, total) = state
        .daos
        .snapshots()
        .list_by_repository_configuration(&org.org_id, uuid, &page)
        .await?;

    let path = format!("{API_PREFIX}/repositories/{uuid}/snapshots");
    Ok(Json(CollectionResponse::new(snapshots, &path, &page, total)))
}
