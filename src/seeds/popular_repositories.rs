//! Popular repository seeding
//!
//! Creates one public repository row for every URL on the popular allow-list.
//! Existing rows are left alone, so the seed can run on every deploy.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::config::CatalogPolicy;
use crate::models::repository::{self, IntrospectionStatus, RepositoryOrigin, normalize_url};

/// Seeds the popular repositories from `policy`.
///
/// Returns the number of repositories created.
pub async fn seed_popular_repositories(
    db: &DatabaseConnection,
    policy: &CatalogPolicy,
) -> Result<usize> {
    let mut created = 0;

    for raw_url in &policy.popular_repository_urls {
        let url = normalize_url(raw_url);
        if url.is_empty() {
            continue;
        }

        let existing = repository::Entity::find()
            .filter(repository::Column::Url.eq(url.as_str()))
            .one(db)
            .await?;

        if existing.is_some() {
            log::info!("Repository '{}' already exists, skipping", url);
            continue;
        }

        log::info!("Creating popular repository: {}", url);
        let now = Utc::now().fixed_offset();
        repository::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            url: Set(url),
            public: Set(true),
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
        .await?;
        created += 1;
    }

    log::info!("Seeded {} popular repositories", created);
    Ok(created)
}
