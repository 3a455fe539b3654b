//! Template entity model
//!
//! A template pins a set of repository configurations to a point in time (or
//! to their latest content) and backs an entitlement environment.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,

    pub org_id: String,

    /// Unique per organization among templates that are not soft-deleted
    pub name: String,

    pub description: String,

    pub arch: String,

    pub version: String,

    /// Pinned snapshot date, mutually exclusive with `use_latest`
    pub date: Option<DateTimeWithTimeZone>,

    pub use_latest: bool,

    pub created_by: Option<String>,

    pub last_updated_by: Option<String>,

    pub last_update_task_uuid: Option<String>,

    pub last_update_snapshot_error: Option<String>,

    pub rhsm_environment_created: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::template_repository_configuration::Entity")]
    TemplateRepositoryConfigurations,
}

impl Related<super::template_repository_configuration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateRepositoryConfigurations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Entitlement environment identifier derived from the template uuid.
    pub fn environment_id(&self) -> String {
        environment_id(self.uuid)
    }
}

/// Renders a template uuid as its entitlement environment id (no dashes).
pub fn environment_id(template_uuid: Uuid) -> String {
    template_uuid.simple().to_string()
}
