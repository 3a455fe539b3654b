//! Module stream entity model
//!
//! Modular metadata advertised by repositories. `package_names` lists the
//! packages a stream provides and is stored as a JSON array.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "module_streams")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,

    pub name: String,

    pub stream: String,

    pub version: String,

    pub context: String,

    pub arch: String,

    pub description: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub package_names: JsonValue,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::repository_module_stream::Entity")]
    RepositoryModuleStreams,
}

impl Related<super::repository_module_stream::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RepositoryModuleStreams.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this stream ships a package with the given name.
    pub fn provides(&self, package_name: &str) -> bool {
        self.package_names
            .as_array()
            .is_some_and(|names| names.iter().any(|name| name.as_str() == Some(package_name)))
    }
}
