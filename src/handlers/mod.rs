//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the content sources API.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::{Page, PaginationQuery};
use crate::db;
use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod repositories;
pub mod rpms;
pub mod snapshots;
pub mod templates;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Database health response
#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    pub status: String,
}

/// Liveness probe that verifies database connectivity
#[utoipa::path(
    get,
    path = "/ping",
    responses(
        (status = 200, description = "Database reachable", body = PingResponse),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn ping(State(state): State<AppState>) -> Result<Json<PingResponse>, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::warn!(error = %err, "Database health check failed");
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "DATABASE_UNAVAILABLE",
            "Database service temporarily unavailable",
        )
    })?;

    Ok(Json(PingResponse {
        status: "ok".to_string(),
    }))
}

pub(crate) fn page_from(limit: Option<u64>, offset: Option<u64>, sort_by: Option<String>) -> Page {
    PaginationQuery {
        limit,
        offset,
        sort_by,
    }
    .page()
}

#[cfg(test)]
mod tests;
