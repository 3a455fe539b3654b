//! Template to repository configuration pin (`templates_repository_configurations`).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "templates_repository_configurations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_uuid: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub repository_configuration_uuid: Uuid,

    /// Distribution serving this configuration's content for the template
    pub distribution_href: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::template::Entity",
        from = "Column::TemplateUuid",
        to = "super::template::Column::Uuid",
        on_delete = "Cascade"
    )]
    Template,
    #[sea_orm(
        belongs_to = "super::repository_configuration::Entity",
        from = "Column::RepositoryConfigurationUuid",
        to = "super::repository_configuration::Column::Uuid",
        on_delete = "Cascade"
    )]
    RepositoryConfiguration,
}

impl Related<super::template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl Related<super::repository_configuration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RepositoryConfiguration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
