//! Integration tests for repository lookups and introspection bookkeeping.

use anyhow::Result;
use chrono::{Duration, Utc};
use content_sources::api::Page;
use content_sources::dao::repositories::{MAX_INTROSPECTION_ERROR_LEN, RepositoryUpdate};
use content_sources::models::repository::{self, IntrospectionStatus};
use sea_orm::EntityTrait;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::*;

#[tokio::test]
async fn fetch_for_url_normalizes_the_lookup() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let stored = insert_repository(&db, "https://repo.example.test/el9", false).await?;

    let found = daos
        .repositories()
        .fetch_for_url("  https://repo.example.test/el9//")
        .await?;
    assert_eq!(found.uuid, stored.uuid);

    let err = daos
        .repositories()
        .fetch_for_url("https://missing.example.test/")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        "Could not find repository with URL https://missing.example.test"
    );
    Ok(())
}

#[tokio::test]
async fn list_public_pages_by_url() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    insert_repository(&db, "https://c.example.test/repo", true).await?;
    insert_repository(&db, "https://a.example.test/repo", true).await?;
    insert_repository(&db, "https://b.example.test/repo", true).await?;
    insert_repository(&db, "https://private.example.test/repo", false).await?;

    let (rows, total) = daos.repositories().list_public(&Page::new(2, 0)).await?;
    assert_eq!(total, 3);
    let urls: Vec<&str> = rows.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://a.example.test/repo", "https://b.example.test/repo"]
    );

    let (rows, _) = daos.repositories().list_public(&Page::new(2, 2)).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].url, "https://c.example.test/repo");
    Ok(())
}

#[tokio::test]
async fn update_writes_only_present_fields() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let stored = insert_repository(&db, "https://repo.example.test/el9", false).await?;
    let introspected = day(30);

    daos.repositories()
        .update(RepositoryUpdate {
            uuid: stored.uuid,
            status: Some(IntrospectionStatus::Invalid),
            last_introspection_time: Some(introspected),
            last_introspection_error: Some("x".repeat(400)),
            failed_introspections_count: Some(3),
            package_count: Some(0),
            ..Default::default()
        })
        .await?;

    let updated = repository::Entity::find_by_id(stored.uuid)
        .one(&db)
        .await?
        .unwrap();
    assert_eq!(updated.status, IntrospectionStatus::Invalid);
    assert_eq!(updated.failed_introspections_count, 3);
    assert_eq!(
        updated.last_introspection_error.as_deref().map(str::len),
        Some(MAX_INTROSPECTION_ERROR_LEN)
    );
    assert_eq!(
        updated.last_introspection_time.map(|t| t.with_timezone(&Utc)),
        Some(introspected)
    );
    assert_eq!(updated.url, stored.url);
    assert!(!updated.public);
    assert!(updated.last_introspection_success_time.is_none());

    let err = daos
        .repositories()
        .update(RepositoryUpdate {
            uuid: uuid::Uuid::new_v4(),
            public: Some(true),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn mark_as_not_public_hides_from_public_listing() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let stored = insert_repository(&db, "https://public.example.test/repo", true).await?;

    daos.repositories()
        .mark_as_not_public("https://public.example.test/repo/")
        .await?;

    let updated = repository::Entity::find_by_id(stored.uuid)
        .one(&db)
        .await?
        .unwrap();
    assert!(!updated.public);
    let (_, total) = daos.repositories().list_public(&Page::default()).await?;
    assert_eq!(total, 0);
    Ok(())
}

#[tokio::test]
async fn introspection_queue_respects_interval_and_failures() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let repositories = daos.repositories();

    let never = insert_repository(&db, "https://never.example.test", false).await?;
    let fresh = insert_repository(&db, "https://fresh.example.test", false).await?;
    let stale = insert_repository(&db, "https://stale.example.test", false).await?;
    let failing = insert_repository(&db, "https://failing.example.test", false).await?;
    let failing_public = insert_repository(&db, "https://failing-public.example.test", true).await?;

    repositories
        .update(RepositoryUpdate {
            uuid: fresh.uuid,
            status: Some(IntrospectionStatus::Valid),
            last_introspection_time: Some(Utc::now() - Duration::hours(1)),
            ..Default::default()
        })
        .await?;
    repositories
        .update(RepositoryUpdate {
            uuid: stale.uuid,
            status: Some(IntrospectionStatus::Valid),
            last_introspection_time: Some(Utc::now() - Duration::hours(48)),
            ..Default::default()
        })
        .await?;
    for uuid in [failing.uuid, failing_public.uuid] {
        repositories
            .update(RepositoryUpdate {
                uuid,
                status: Some(IntrospectionStatus::Invalid),
                last_introspection_time: Some(Utc::now() - Duration::hours(1)),
                failed_introspections_count: Some(21),
                ..Default::default()
            })
            .await?;
    }

    let due: Vec<_> = repositories
        .list_for_introspection(None, false)
        .await?
        .into_iter()
        .map(|r| r.uuid)
        .collect();
    assert_eq!(due.len(), 3);
    assert!(due.contains(&never.uuid));
    assert!(due.contains(&stale.uuid));
    assert!(due.contains(&failing_public.uuid));

    let forced = repositories.list_for_introspection(None, true).await?;
    assert_eq!(forced.len(), 5);

    let selected = repositories
        .list_for_introspection(
            Some(&[
                "https://fresh.example.test/".to_string(),
                "https://never.example.test".to_string(),
            ]),
            false,
        )
        .await?;
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].uuid, never.uuid);
    Ok(())
}
