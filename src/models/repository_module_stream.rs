//! Repository to module stream association (`repositories_module_streams`).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "repositories_module_streams")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub repository_uuid: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub module_stream_uuid: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repository::Entity",
        from = "Column::RepositoryUuid",
        to = "super::repository::Column::Uuid",
        on_delete = "Cascade"
    )]
    Repository,
    #[sea_orm(
        belongs_to = "super::module_stream::Entity",
        from = "Column::ModuleStreamUuid",
        to = "super::module_stream::Column::Uuid",
        on_delete = "Cascade"
    )]
    ModuleStream,
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl Related<super::module_stream::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModuleStream.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
