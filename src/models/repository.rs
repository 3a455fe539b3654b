//! Repository entity model
//!
//! This module contains the SeaORM entity model for the repositories table,
//! which holds one row per distinct content source URL regardless of how many
//! organizations reference it.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Introspection status of a repository.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum IntrospectionStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Valid")]
    Valid,
    #[sea_orm(string_value = "Invalid")]
    Invalid,
    #[sea_orm(string_value = "Unavailable")]
    Unavailable,
}

/// Where a repository's content comes from.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum RepositoryOrigin {
    #[sea_orm(string_value = "external")]
    External,
    #[sea_orm(string_value = "red_hat")]
    RedHat,
    #[sea_orm(string_value = "upload")]
    Upload,
}

/// Repository entity keyed by a normalized URL
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,

    /// Content URL, stored without a trailing slash
    #[sea_orm(unique)]
    pub url: String,

    /// Public repositories are readable by every organization
    pub public: bool,

    pub origin: RepositoryOrigin,

    pub status: IntrospectionStatus,

    pub last_introspection_time: Option<DateTimeWithTimeZone>,

    pub last_introspection_success_time: Option<DateTimeWithTimeZone>,

    pub last_introspection_update_time: Option<DateTimeWithTimeZone>,

    pub last_introspection_error: Option<String>,

    /// Consecutive failed introspections
    pub failed_introspections_count: i32,

    pub package_count: i32,

    pub repomd_checksum: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::repository_configuration::Entity")]
    RepositoryConfigurations,
    #[sea_orm(has_many = "super::repository_rpm::Entity")]
    RepositoryRpms,
}

impl Related<super::repository_configuration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RepositoryConfigurations.def()
    }
}

impl Related<super::repository_rpm::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RepositoryRpms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Normalizes a repository URL for storage and lookup.
///
/// Surrounding whitespace and every trailing slash are removed, so
/// `https://example.test/repo///` and `https://example.test/repo` compare equal.
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
