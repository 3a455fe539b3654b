//! Rpm entity model
//!
//! Package rows are global: one row per distinct checksum, shared by every
//! repository that lists the package.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "rpms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,

    /// Content checksum, unique across the catalog
    #[sea_orm(unique)]
    pub checksum: String,

    pub name: String,

    pub arch: String,

    pub version: String,

    pub release: String,

    pub epoch: i32,

    pub summary: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::repository_rpm::Entity")]
    RepositoryRpms,
}

impl Related<super::repository_rpm::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RepositoryRpms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
