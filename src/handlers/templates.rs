//! # Template Endpoints
//!
//! Template CRUD plus the package and errata listings of the snapshots a
//! template resolves to. Updates that change the pinned repositories also
//! promote and demote content in the template's entitlement environment when
//! an entitlement client is configured.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::api::errata::{ErrataQuery, SnapshotErrata};
use crate::api::rpms::{SnapshotRpm, SnapshotRpmQuery};
use crate::api::templates::{
    TemplateFilters, TemplateListQuery, TemplateRequest, TemplateResponse, TemplateUpdateRequest,
};
use crate::api::{CollectionResponse, split_comma_list};
use crate::auth::{OrgContext, OrgHeaders};
use crate::clients::content_id;
use crate::error::{ApiError, DaoError, validation_error};
use crate::handlers::page_from;
use crate::handlers::rpms::errata_filters;
use crate::models::template::environment_id;
use crate::server::{API_PREFIX, AppState};

fn parse_repository_uuids(raw: Option<&str>) -> Result<Vec<Uuid>, ApiError> {
    split_comma_list(raw)
        .iter()
        .map(|value| {
            Uuid::parse_str(value).map_err(|_| {
                validation_error(
                    "Invalid repository UUID",
                    json!({ "repository_uuids": format!("{value} is not a valid UUID") }),
                )
            })
        })
        .collect()
}

/// Create a template
#[utoipa::path(
    post,
    path = "/api/content-sources/v1/templates",
    params(OrgHeaders),
    request_body = TemplateRequest,
    responses(
        (status = 201, description = "Template created", body = TemplateResponse),
        (status = 400, description = "Invalid template", body = ApiError),
        (status = 404, description = "Repository not found", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn create_template(
    State(state): State<AppState>,
    org: OrgContext,
    payload: Result<Json<TemplateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TemplateResponse>), ApiError> {
    let Json(mut request) = payload?;
    request.org_id = Some(org.org_id);
    request.user = org.user;

    let template = state.daos.templates().create(request).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// List templates
#[utoipa::path(
    get,
    path = "/api/content-sources/v1/templates",
    params(TemplateListQuery, OrgHeaders),
    responses(
        (status = 200, description = "Templates listed", body = CollectionResponse<TemplateResponse>),
        (status = 400, description = "Invalid filters", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn list_templates(
    State(state): State<AppState>,
    org: OrgContext,
    Query(query): Query<TemplateListQuery>,
) -> Result<Json<CollectionResponse<TemplateResponse>>, ApiError> {
    let page = page_from(query.limit, query.offset, query.sort_by.clone());
    let filters = TemplateFilters {
        name: query.name,
        version: query.version,
        arch: query.arch,
        search: query.search,
        repository_uuids: parse_repository_uuids(query.repository_uuids.as_deref())?,
    };

    let (templates, total) = state
        .daos
        .templates()
        .list(&org.org_id, false, &page, &filters)
        .await?;

    let path = format!("{API_PREFIX}/templates");
    Ok(Json(CollectionResponse::new(templates, &path, &page, total)))
}

/// Fetch a template
#[utoipa::path(
    get,
    path = "/api/content-sources/v1/templates/{uuid}",
    params(("uuid" = Uuid, Path, description = "Template UUID"), OrgHeaders),
    responses(
        (status = 200, description = "Template found", body = TemplateResponse),
        (status = 404, description = "Template not found", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn get_template(
    State(state): State<AppState>,
    org: OrgContext,
    Path(uuid): Path<Uuid>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let template = state.daos.templates().fetch(&org.org_id, uuid, false).await?;
    Ok(Json(template))
}

/// Partially update a template
#[utoipa::path(
    patch,
    path = "/api/content-sources/v1/templates/{uuid}",
    params(("uuid" = Uuid, Path, description = "Template UUID"), OrgHeaders),
    request_body = TemplateUpdateRequest,
    responses(
        (status = 200, description = "Template updated", body = TemplateResponse),
        (status = 400, description = "Invalid update", body = ApiError),
        (status = 404, description = "Template or repository not found", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn update_template(
    State(state): State<AppState>,
    org: OrgContext,
    Path(uuid): Path<Uuid>,
    payload: Result<Json<TemplateUpdateRequest>, JsonRejection>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let Json(mut request) = payload?;
    request.user = org.user;

    let templates = state.daos.templates();
    let changes = match &request.repository_uuids {
        Some(requested) => Some(templates.get_repo_changes(uuid, requested).await?),
        None => None,
    };

    let template = templates.update(&org.org_id, uuid, request).await?;

    if let (Some(changes), Some(entitlements)) = (changes, state.daos.entitlements.as_ref()) {
        let environment = environment_id(uuid);
        let added: Vec<String> = changes.added.iter().copied().map(content_id).collect();
        let removed: Vec<String> = changes.removed.iter().copied().map(content_id).collect();

        if !added.is_empty() {
            entitlements
                .promote_content(&environment, &added)
                .await
                .map_err(DaoError::from)?;
        }
        if !removed.is_empty() {
            entitlements
                .demote_content(&environment, &removed)
                .await
                .map_err(DaoError::from)?;
        }

        tracing::info!(
            template_uuid = %uuid,
            environment_id = %environment,
            promoted = added.len(),
            demoted = removed.len(),
            "Synchronized template entitlement content"
        );
    }

    Ok(Json(template))
}

/// Soft-delete a template
#[utoipa::path(
    delete,
    path = "/api/content-sources/v1/templates/{uuid}",
    params(("uuid" = Uuid, Path, description = "Template UUID"), OrgHeaders),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 404, description = "Template not found", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn delete_template(
    State(state): State<AppState>,
    org: OrgContext,
    Path(uuid): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.daos.templates().soft_delete(&org.org_id, uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the packages a template currently provides
#[utoipa::path(
    get,
    path = "/api/content-sources/v1/templates/{uuid}/rpms",
    params(
        ("uuid" = Uuid, Path, description = "Template UUID"),
        SnapshotRpmQuery,
        OrgHeaders
    ),
    responses(
        (status = 200, description = "Packages listed", body = CollectionResponse<SnapshotRpm>),
        (status = 404, description = "Template not found", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn list_template_rpms(
    State(state): State<AppState>,
    org: OrgContext,
    Path(uuid): Path<Uuid>,
    Query(query): Query<SnapshotRpmQuery>,
) -> Result<Json<CollectionResponse<SnapshotRpm>>, ApiError> {
    let page = page_from(query.limit, query.offset, None);
    let (rpms, total) = state
        .daos
        .rpms()
        .list_template_rpms(
            &org.org_id,
            uuid,
            query.search.as_deref().unwrap_or_default(),
            &page,
        )
        .await?;

    let path = format!("{API_PREFIX}/templates/{uuid}/rpms");
    Ok(Json(CollectionResponse::new(rpms, &path, &page, total)))
}

/// List the errata a template currently provides
#[utoipa::path(
    get,
    path = "/api/content-sources/v1/templates/{uuid}/errata",
    params(
        ("uuid" = Uuid, Path, description = "Template UUID"),
        ErrataQuery,
        OrgHeaders
    ),
    responses(
        (status = 200, description = "Errata listed", body = CollectionResponse<SnapshotErrata>),
        (status = 404, description = "Template not found", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn list_template_errata(
    State(state): State<AppState>,
    org: OrgContext,
    Path(uuid): Path<Uuid>,
    Query(query): Query<ErrataQuery>,
) -> Result<Json<CollectionResponse<SnapshotErrata>>, ApiError> {
    let page = page_from(query.limit, query.offset, query.sort_by.clone());
    let (errata, total) = state
        .daos
        .rpms()
        .list_template_errata(&org.org_id, uuid, &errata_filters(&query), &page)
        .await?;

    let path = format!("{API_PREFIX}/templates/{uuid}/errata");
    Ok(Json(CollectionResponse::new(errata, &path, &page, total)))
}
