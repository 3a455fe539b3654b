//! Snapshot entity model
//!
//! An immutable capture of a repository configuration's content. The hrefs
//! point into the external content service.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,

    pub repository_configuration_uuid: Uuid,

    /// Repository version href used for package and errata listings
    pub version_href: String,

    pub publication_href: String,

    pub distribution_path: String,

    pub distribution_href: String,

    /// Content type to count maps
    #[sea_orm(column_type = "JsonBinary")]
    pub content_counts: JsonValue,

    #[sea_orm(column_type = "JsonBinary")]
    pub added_counts: JsonValue,

    #[sea_orm(column_type = "JsonBinary")]
    pub removed_counts: JsonValue,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repository_configuration::Entity",
        from = "Column::RepositoryConfigurationUuid",
        to = "super::repository_configuration::Column::Uuid",
        on_delete = "Cascade"
    )]
    RepositoryConfiguration,
}

impl Related<super::repository_configuration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RepositoryConfiguration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
