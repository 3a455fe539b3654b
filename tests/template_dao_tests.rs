//! Integration tests for templates: creation rules, listing filters, the
//! repository diff and soft deletion.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use content_sources::api::Page;
use content_sources::api::templates::{TemplateFilters, TemplateRequest, TemplateUpdateRequest};
use content_sources::dao::DaoRegistry;
use content_sources::models::template_repository_configuration;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::*;

fn request(org_id: &str, name: &str, repository_uuids: Vec<Uuid>) -> TemplateRequest {
    TemplateRequest {
        org_id: Some(org_id.to_string()),
        name: Some(name.to_string()),
        arch: Some("x86_64".to_string()),
        version: Some("9".to_string()),
        repository_uuids,
        user: Some("alice".to_string()),
        ..Default::default()
    }
}

async fn configurations(db: &DatabaseConnection, org_id: &str, count: usize) -> Result<Vec<Uuid>> {
    let mut uuids = Vec::with_capacity(count);
    for i in 0..count {
        let (_, configuration) =
            insert_owned_repository(db, org_id, &format!("https://repo.example.test/{org_id}/{i}"))
                .await?;
        uuids.push(configuration.uuid);
    }
    Ok(uuids)
}

fn set(uuids: &[Uuid]) -> HashSet<Uuid> {
    uuids.iter().copied().collect()
}

#[tokio::test]
async fn create_pins_configurations_and_records_user() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let repos = configurations(&db, "acme", 2).await?;
    let (_, curated) =
        insert_owned_repository(&db, RED_HAT_ORG, "https://cdn.example.test/rhel9").await?;

    let mut uuids = repos.clone();
    uuids.push(curated.uuid);
    uuids.push(repos[0]);

    let created = daos
        .templates()
        .create(TemplateRequest {
            date: Some(day(3)),
            ..request("acme", "baseline", uuids)
        })
        .await?;

    assert_eq!(created.org_id, "acme");
    assert_eq!(created.created_by.as_deref(), Some("alice"));
    assert_eq!(created.last_updated_by.as_deref(), Some("alice"));
    assert_eq!(created.date, Some(day(3)));
    assert!(!created.use_latest);
    assert_eq!(created.repository_uuids.len(), 3);
    assert_eq!(created.rhsm_environment_id, created.uuid.simple().to_string());

    let fetched = daos.templates().fetch("acme", created.uuid, false).await?;
    assert_eq!(
        set(&fetched.repository_uuids),
        HashSet::from([repos[0], repos[1], curated.uuid])
    );
    Ok(())
}

#[tokio::test]
async fn create_validates_required_fields_and_date() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);

    let err = daos
        .templates()
        .create(TemplateRequest {
            arch: None,
            ..request("acme", "baseline", vec![])
        })
        .await
        .unwrap_err();
    assert!(err.is_bad_validation());
    assert_eq!(err.to_string(), "arch is required");

    let err = daos
        .templates()
        .create(TemplateRequest {
            name: Some("   ".to_string()),
            ..request("acme", "baseline", vec![])
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "name is required");

    let err = daos
        .templates()
        .create(TemplateRequest {
            use_latest: Some(true),
            date: Some(day(1)),
            ..request("acme", "baseline", vec![])
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Date cannot be set when use_latest is true");
    Ok(())
}

#[tokio::test]
async fn create_rejects_duplicate_names_within_an_organization() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);

    daos.templates()
        .create(request("acme", "baseline", vec![]))
        .await?;
    let err = daos
        .templates()
        .create(request("acme", "baseline", vec![]))
        .await
        .unwrap_err();
    assert!(err.is_bad_validation());
    assert_eq!(
        err.to_string(),
        "Template with this name already belongs to organization"
    );

    daos.templates()
        .create(request("other", "baseline", vec![]))
        .await?;
    Ok(())
}

#[tokio::test]
async fn create_rejects_unreadable_configurations_without_writing() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let foreign = configurations(&db, "other", 1).await?;

    let err = daos
        .templates()
        .create(request("acme", "baseline", foreign.clone()))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        format!("Could not find repository with UUID {}", foreign[0])
    );

    let (_, total) = daos
        .templates()
        .list("acme", true, &Page::default(), &TemplateFilters::default())
        .await?;
    assert_eq!(total, 0);
    Ok(())
}

#[tokio::test]
async fn replacing_repositories_only_writes_the_difference() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let repos = configurations(&db, "acme", 4).await?;
    let (a, b, c, d) = (repos[0], repos[1], repos[2], repos[3]);

    let template = daos
        .templates()
        .create(request("acme", "baseline", vec![a, b, c]))
        .await?;

    let changes = daos
        .templates()
        .get_repo_changes(template.uuid, &[a, c, d])
        .await?;
    assert_eq!(changes.added, vec![d]);
    assert_eq!(changes.removed, vec![b]);
    assert_eq!(changes.unchanged, vec![a, c]);
    assert_eq!(changes.all, vec![a, c, d, b]);

    let updated = daos
        .templates()
        .update(
            "acme",
            template.uuid,
            TemplateUpdateRequest {
                repository_uuids: Some(vec![a, c, d]),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(set(&updated.repository_uuids), HashSet::from([a, c, d]));

    let pinned: HashSet<Uuid> = template_repository_configuration::Entity::find()
        .filter(template_repository_configuration::Column::TemplateUuid.eq(template.uuid))
        .all(&db)
        .await?
        .into_iter()
        .map(|row| row.repository_configuration_uuid)
        .collect();
    assert_eq!(pinned, HashSet::from([a, c, d]));

    let unchanged = daos
        .templates()
        .get_repo_changes(template.uuid, &[a, c, d])
        .await?;
    assert!(unchanged.added.is_empty());
    assert!(unchanged.removed.is_empty());
    Ok(())
}

#[tokio::test]
async fn update_handles_dates_and_use_latest() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let template = daos
        .templates()
        .create(TemplateRequest {
            date: Some(day(5)),
            ..request("acme", "baseline", vec![])
        })
        .await?;

    let err = daos
        .templates()
        .update(
            "acme",
            template.uuid,
            TemplateUpdateRequest {
                use_latest: Some(true),
                date: Some(Some(day(6))),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_bad_validation());

    let latest = daos
        .templates()
        .update(
            "acme",
            template.uuid,
            TemplateUpdateRequest {
                use_latest: Some(true),
                user: Some("bob".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert!(latest.use_latest);
    assert_eq!(latest.date, None);
    assert_eq!(latest.last_updated_by.as_deref(), Some("bob"));
    assert_eq!(latest.created_by.as_deref(), Some("alice"));

    let pinned = daos
        .templates()
        .update(
            "acme",
            template.uuid,
            TemplateUpdateRequest {
                use_latest: Some(false),
                date: Some(Some(day(9))),
                description: Some("pinned again".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert!(!pinned.use_latest);
    assert_eq!(pinned.date, Some(day(9)));
    assert_eq!(pinned.description, "pinned again");

    let err = daos
        .templates()
        .update("other", template.uuid, TemplateUpdateRequest::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn list_applies_filters_and_sorting() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let repos = configurations(&db, "acme", 2).await?;

    daos.templates()
        .create(request("acme", "web-servers", vec![repos[0]]))
        .await?;
    daos.templates()
        .create(TemplateRequest {
            version: Some("8".to_string()),
            ..request("acme", "db-servers", vec![repos[1]])
        })
        .await?;
    daos.templates()
        .create(TemplateRequest {
            arch: Some("aarch64".to_string()),
            ..request("acme", "edge", vec![])
        })
        .await?;

    let names = |rows: &[content_sources::api::templates::TemplateResponse]| {
        rows.iter().map(|t| t.name.clone()).collect::<Vec<_>>()
    };

    let (rows, total) = daos
        .templates()
        .list("acme", false, &Page::default(), &TemplateFilters::default())
        .await?;
    assert_eq!(total, 3);
    assert_eq!(names(&rows), vec!["db-servers", "edge", "web-servers"]);

    let (rows, _) = daos
        .templates()
        .list(
            "acme",
            false,
            &Page::default().with_sort_by("name:desc"),
            &TemplateFilters::default(),
        )
        .await?;
    assert_eq!(names(&rows), vec!["web-servers", "edge", "db-servers"]);

    let (rows, total) = daos
        .templates()
        .list(
            "acme",
            false,
            &Page::default(),
            &TemplateFilters {
                search: Some("servers".to_string()),
                version: Some("9".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(total, 1);
    assert_eq!(names(&rows), vec!["web-servers"]);

    let (rows, _) = daos
        .templates()
        .list(
            "acme",
            false,
            &Page::default(),
            &TemplateFilters {
                arch: Some("aarch64".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(names(&rows), vec!["edge"]);

    let (rows, _) = daos
        .templates()
        .list(
            "acme",
            false,
            &Page::default(),
            &TemplateFilters {
                repository_uuids: vec![repos[1]],
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(names(&rows), vec!["db-servers"]);
    assert_eq!(rows[0].repository_uuids, vec![repos[1]]);

    let (rows, total) = daos
        .templates()
        .list("acme", false, &Page::new(1, 1), &TemplateFilters::default())
        .await?;
    assert_eq!(total, 3);
    assert_eq!(names(&rows), vec!["edge"]);
    Ok(())
}

#[tokio::test]
async fn soft_delete_hides_until_cleared() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let template = daos
        .templates()
        .create(request("acme", "baseline", vec![]))
        .await?;

    daos.templates().soft_delete("acme", template.uuid).await?;

    assert!(
        daos.templates()
            .fetch("acme", template.uuid, false)
            .await
            .unwrap_err()
            .is_not_found()
    );
    let deleted = daos.templates().fetch("acme", template.uuid, true).await?;
    assert!(deleted.deleted_at.is_some());

    let (_, visible) = daos
        .templates()
        .list("acme", false, &Page::default(), &TemplateFilters::default())
        .await?;
    assert_eq!(visible, 0);
    let (_, including_deleted) = daos
        .templates()
        .list("acme", true, &Page::default(), &TemplateFilters::default())
        .await?;
    assert_eq!(including_deleted, 1);

    // Deleting twice is a miss
    assert!(
        daos.templates()
            .soft_delete("acme", template.uuid)
            .await
            .unwrap_err()
            .is_not_found()
    );

    daos.templates()
        .clear_deleted_at("acme", template.uuid)
        .await?;
    let restored = daos.templates().fetch("acme", template.uuid, false).await?;
    assert!(restored.deleted_at.is_none());
    Ok(())
}

#[tokio::test]
async fn hard_delete_removes_pins() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let repos = configurations(&db, "acme", 2).await?;
    let template = daos
        .templates()
        .create(request("acme", "baseline", repos))
        .await?;

    daos.templates().soft_delete("acme", template.uuid).await?;
    daos.templates().delete("acme", template.uuid).await?;

    assert!(
        daos.templates()
            .fetch("acme", template.uuid, true)
            .await
            .unwrap_err()
            .is_not_found()
    );
    let pins = template_repository_configuration::Entity::find()
        .filter(template_repository_configuration::Column::TemplateUuid.eq(template.uuid))
        .all(&db)
        .await?;
    assert!(pins.is_empty());
    Ok(())
}

#[tokio::test]
async fn distribution_hrefs_replace_pins() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let repos = configurations(&db, "acme", 3).await?;
    let template = daos
        .templates()
        .create(request("acme", "baseline", vec![repos[0], repos[1]]))
        .await?;

    let hrefs = HashMap::from([(repos[1], "/pulp/distributions/b/".to_string())]);
    daos.templates()
        .update_distribution_hrefs(template.uuid, &[repos[1], repos[2]], &hrefs)
        .await?;

    let rows: HashMap<Uuid, Option<String>> = template_repository_configuration::Entity::find()
        .filter(template_repository_configuration::Column::TemplateUuid.eq(template.uuid))
        .all(&db)
        .await?
        .into_iter()
        .map(|row| (row.repository_configuration_uuid, row.distribution_href))
        .collect();

    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[&repos[1]].as_deref(),
        Some("/pulp/distributions/b/")
    );
    assert_eq!(rows[&repos[2]], None);
    Ok(())
}

#[tokio::test]
async fn bookkeeping_fields_are_recorded() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = registry(&db);
    let template = daos
        .templates()
        .create(request("acme", "baseline", vec![]))
        .await?;

    daos.templates()
        .update_last_update_task(template.uuid, "task-42")
        .await?;
    daos.templates()
        .update_last_error("acme", template.uuid, "snapshot missing")
        .await?;
    daos.templates()
        .set_environment_created(template.uuid)
        .await?;

    let fetched = daos.templates().fetch("acme", template.uuid, false).await?;
    assert_eq!(fetched.last_update_task_uuid.as_deref(), Some("task-42"));
    assert_eq!(
        fetched.last_update_snapshot_error.as_deref(),
        Some("snapshot missing")
    );
    assert!(fetched.rhsm_environment_created);
    Ok(())
}

#[tokio::test]
async fn registry_shares_one_policy() -> Result<()> {
    let db = setup_test_db().await?;
    let daos = DaoRegistry::new(db.clone(), test_policy());
    assert_eq!(daos.policy.red_hat_org_id, RED_HAT_ORG);
    assert!(daos.entitlements.is_none());
    Ok(())
}
