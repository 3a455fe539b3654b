//! # Tests for Handlers
//!
//! Router-level tests against an in-memory SQLite catalog.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::ORG_ID_HEADER;
use crate::config::AppConfig;
use crate::models::repository::{IntrospectionStatus, RepositoryOrigin};
use crate::models::{repository, repository_configuration};
use crate::server::{API_PREFIX, AppState, create_app};

async fn test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

async fn test_app() -> (Router, DatabaseConnection) {
    let db = test_db().await;
    let state = AppState::new(AppConfig::default(), db.clone());
    (create_app(state), db)
}

async fn insert_configuration(db: &DatabaseConnection, org_id: &str, url: &str) -> Uuid {
    let now = Utc::now().fixed_offset();
    let repository = repository::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        url: Set(url.to_string()),
        public: Set(false),
        origin: Set(RepositoryOrigin::External),
        status: Set(IntrospectionStatus::Pending),
        last_introspection_time: Set(None),
        last_introspection_success_time: Set(None),
        last_introspection_update_time: Set(None),
        last_introspection_error: Set(None),
        failed_introspections_count: Set(0),
        package_count: Set(0),
        repomd_checksum: Set(String::new()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();

    repository_configuration::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        name: Set(format!("config for {url}")),
        org_id: Set(org_id.to_string()),
        repository_uuid: Set(repository.uuid),
        versions: Set(None),
        arch: Set("x86_64".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(db)
    .await
    .unwrap()
    .uuid
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(path: &str, org_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(org_id) = org_id {
        builder = builder.header(ORG_ID_HEADER, org_id);
    }
    builder.body(Body::empty()).unwrap()
}

fn with_json(method: &str, path: &str, org_id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(ORG_ID_HEADER, org_id)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn root_returns_service_info() {
    let (app, _db) = test_app().await;
    let (status, body) = send(&app, get("/", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "content-sources");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn ping_reports_database_health() {
    let (app, _db) = test_app().await;
    let (status, body) = send(&app, get("/ping", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn responses_echo_request_id() {
    let (app, _db) = test_app().await;
    let request = Request::builder()
        .uri("/")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-123");
}

#[tokio::test]
async fn catalog_routes_require_org_header() {
    let (app, _db) = test_app().await;
    let (status, body) = send(&app, get(&format!("{API_PREFIX}/templates"), None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn public_repositories_are_paginated() {
    let (app, _db) = test_app().await;
    let (status, body) = send(
        &app,
        get(&format!("{API_PREFIX}/public_repositories?limit=0"), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["count"], 0);
    assert_eq!(body["meta"]["limit"], 100);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn unknown_template_is_not_found() {
    let (app, _db) = test_app().await;
    let uuid = Uuid::new_v4();
    let (status, body) = send(
        &app,
        get(&format!("{API_PREFIX}/templates/{uuid}"), Some("acme")),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        format!("Could not find template with UUID {uuid}")
    );
}

#[tokio::test]
async fn template_lifecycle_over_http() {
    let (app, db) = test_app().await;
    let config_uuid = insert_configuration(&db, "acme", "https://repo.example.test/el9").await;
    let templates = format!("{API_PREFIX}/templates");

    let (status, created) = send(
        &app,
        with_json(
            "POST",
            &templates,
            "acme",
            json!({
                "name": "baseline",
                "arch": "x86_64",
                "version": "9",
                "repository_uuids": [config_uuid],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["org_id"], "acme");
    let uuid = created["uuid"].as_str().unwrap().to_string();

    let (status, listed) = send(&app, get(&templates, Some("acme"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["meta"]["count"], 1);

    let (status, other_org) = send(&app, get(&templates, Some("other"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(other_org["meta"]["count"], 0);

    let (status, duplicate) = send(
        &app,
        with_json(
            "POST",
            &templates,
            "acme",
            json!({ "name": "baseline", "arch": "x86_64", "version": "9" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        duplicate["message"],
        "Template with this name already belongs to organization"
    );

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("{templates}/{uuid}"))
        .header(ORG_ID_HEADER, "acme")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&format!("{templates}/{uuid}"), Some("acme"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn template_with_foreign_repository_is_rejected() {
    let (app, db) = test_app().await;
    let config_uuid = insert_configuration(&db, "other", "https://repo.example.test/private").await;

    let (status, body) = send(
        &app,
        with_json(
            "POST",
            &format!("{API_PREFIX}/templates"),
            "acme",
            json!({
                "name": "baseline",
                "arch": "x86_64",
                "version": "9",
                "repository_uuids": [config_uuid],
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        format!("Could not find repository with UUID {config_uuid}")
    );
}

#[tokio::test]
async fn search_without_urls_or_uuids_is_rejected() {
    let (app, _db) = test_app().await;
    let (status, body) = send(
        &app,
        with_json(
            "POST",
            &format!("{API_PREFIX}/rpms/names"),
            "acme",
            json!({ "search": "vim" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "must contain at least 1 URL or 1 UUID");
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let (app, _db) = test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri(format!("{API_PREFIX}/rpms/presence"))
        .header(ORG_ID_HEADER, "acme")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn repository_snapshots_require_visible_configuration() {
    let (app, db) = test_app().await;
    let config_uuid = insert_configuration(&db, "acme", "https://repo.example.test/snap").await;
    let path = format!("{API_PREFIX}/repositories/{config_uuid}/snapshots");

    let (status, body) = send(&app, get(&path, Some("acme"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["count"], 0);

    let (status, _) = send(&app, get(&path, Some("other"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn openapi_document_lists_catalog_paths() {
    let (app, _db) = test_app().await;
    let (status, body) = send(&app, get("/openapi.json", None)).await;

    assert_eq!(status, StatusCode::OK);
    let paths = body["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/content-sources/v1/rpms/names"));
    assert!(paths.contains_key("/api/content-sources/v1/templates/{uuid}"));
}
