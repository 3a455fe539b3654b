//! Public repository listing.

use axum::{
    extract::{Query, State},
    response::Json,
};

use crate::api::repositories::PublicRepository;
use crate::api::{CollectionResponse, PaginationQuery};
use crate::error::ApiError;
use crate::server::{API_PREFIX, AppState};

/// List repositories readable by every organization
#[utoipa::path(
    get,
    path = "/api/content-sources/v1/public_repositories",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Public repositories listed", body = CollectionResponse<PublicRepository>)
    ),
    tag = "repositories"
)]
pub async fn list_public_repositories(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<CollectionResponse<PublicRepository>>, ApiError> {
    let page = query.page();
    let (repositories, total) = state.daos.repositories().list_public(&page).await?;

    let path = format!("{API_PREFIX}/public_repositories");
    Ok(Json(CollectionResponse::new(repositories, &path, &page, total)))
}
