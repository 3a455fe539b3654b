//! Repository configuration entity model
//!
//! Configurations bind an organization to a repository and are the unit of
//! ownership used when scoping reads.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "repository_configurations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,

    pub name: String,

    /// Owning organization
    pub org_id: String,

    pub repository_uuid: Uuid,

    /// Distribution versions as a JSON array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub versions: Option<JsonValue>,

    pub arch: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    /// Soft delete marker
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repository::Entity",
        from = "Column::RepositoryUuid",
        to = "super::repository::Column::Uuid"
    )]
    Repository,
    #[sea_orm(has_many = "super::snapshot::Entity")]
    Snapshots,
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl Related<super::snapshot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
