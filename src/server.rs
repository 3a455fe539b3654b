//! # Server Configuration
//!
//! Router assembly, shared state and the HTTP server loop for the content
//! sources API.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::dao::DaoRegistry;
use crate::handlers;
use crate::telemetry::trace_context_middleware;

/// Prefix shared by every catalog route
pub const API_PREFIX: &str = "/api/content-sources/v1";

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub daos: DaoRegistry,
}

impl AppState {
    /// Builds state with a DAO registry derived from the configuration.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let daos = DaoRegistry::new(db.clone(), config.catalog_policy());
        Self {
            config: Arc::new(config),
            db,
            daos,
        }
    }

    /// Replaces the DAO registry, e.g. to inject external clients.
    pub fn with_daos(mut self, daos: DaoRegistry) -> Self {
        self.daos = daos;
        self
    }
}

fn api_routes() -> Router<AppState> {
    use handlers::{repositories, rpms, snapshots, templates};

    Router::new()
        .route(
            "/public_repositories",
            get(repositories::list_public_repositories),
        )
        .route("/repositories/{uuid}/rpms", get(rpms::list_repository_rpms))
        .route(
            "/repositories/{uuid}/snapshots",
            get(snapshots::list_repository_snapshots),
        )
        .route("/rpms/names", post(rpms::search_rpms))
        .route("/rpms/presence", post(rpms::detect_rpms))
        .route("/snapshots/rpms/names", post(rpms::search_snapshot_rpms))
        .route("/snapshots/{uuid}/rpms", get(rpms::list_snapshot_rpms))
        .route("/snapshots/{uuid}/errata", get(rpms::list_snapshot_errata))
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/templates/{uuid}",
            get(templates::get_template)
                .patch(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/templates/{uuid}/rpms", get(templates::list_template_rpms))
        .route(
            "/templates/{uuid}/errata",
            get(templates::list_template_errata),
        )
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/ping", get(handlers::ping))
        .nest(API_PREFIX, api_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Serves the API until `shutdown` is cancelled.
pub async fn run_server(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = state.config.bind_addr()?;
    let profile = state.config.profile.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::ping,
        crate::handlers::repositories::list_public_repositories,
        crate::handlers::rpms::list_repository_rpms,
        crate::handlers::rpms::search_rpms,
        crate::handlers::rpms::detect_rpms,
        crate::handlers::rpms::search_snapshot_rpms,
        crate::handlers::rpms::list_snapshot_rpms,
        crate::handlers::rpms::list_snapshot_errata,
        crate::handlers::snapshots::list_repository_snapshots,
        crate::handlers::templates::create_template,
        crate::handlers::templates::list_templates,
        crate::handlers::templates::get_template,
        crate::handlers::templates::update_template,
        crate::handlers::templates::delete_template,
        crate::handlers::templates::list_template_rpms,
        crate::handlers::templates::list_template_errata,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::PingResponse,
            crate::error::ApiError,
            crate::api::ResponseMetadata,
            crate::api::Links,
            crate::api::repositories::PublicRepository,
            crate::api::rpms::RepositoryRpm,
            crate::api::rpms::SnapshotRpm,
            crate::api::rpms::ContentUnitSearchRequest,
            crate::api::rpms::SnapshotSearchRpmRequest,
            crate::api::rpms::DetectRpmsRequest,
            crate::api::rpms::DetectRpmsResponse,
            crate::api::rpms::SearchRpmResponse,
            crate::api::rpms::PackageSourcesResponse,
            crate::api::errata::SnapshotErrata,
            crate::api::snapshots::SnapshotResponse,
            crate::api::templates::TemplateRequest,
            crate::api::templates::TemplateUpdateRequest,
            crate::api::templates::TemplateResponse,
            crate::models::repository::IntrospectionStatus,
            crate::models::repository::RepositoryOrigin,
        )
    ),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "repositories", description = "Public repository catalog"),
        (name = "rpms", description = "Package search and presence detection"),
        (name = "snapshots", description = "Snapshot content"),
        (name = "templates", description = "Content templates"),
    ),
    info(
        title = "Content Sources API",
        description = "Catalog of RPM repositories, packages, snapshots and templates",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
