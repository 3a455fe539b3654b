//! Repository to package association (`repositories_rpms`).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "repositories_rpms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub repository_uuid: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub rpm_uuid: Uuid,
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
        belongs_to = "super::rpm::Entity",
        from = "Column::RpmUuid",
        to = "super::rpm::Column::Uuid",
        on_delete = "Cascade"
    )]
    Rpm,
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl Related<super::rpm::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rpm.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
