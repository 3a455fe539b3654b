//! Migration to create templates and their pinned repository configurations.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

use crate::m2025_01_06_090100_create_repository_configurations::RepositoryConfigurations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Templates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Templates::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Templates::OrgId).string_len(255).not_null())
                    .col(ColumnDef::new(Templates::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Templates::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Templates::Arch).string_len(255).not_null())
                    .col(ColumnDef::new(Templates::Version).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Templates::Date)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Templates::UseLatest)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Templates::CreatedBy).text().null())
                    .col(ColumnDef::new(Templates::LastUpdatedBy).text().null())
                    .col(ColumnDef::new(Templates::LastUpdateTaskUuid).text().null())
                    .col(
                        ColumnDef::new(Templates::LastUpdateSnapshotError)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Templates::RhsmEnvironmentCreated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Templates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Templates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Templates::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Names are unique per org among templates that have not been soft-deleted
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_templates_org_id_name \
                 ON templates (org_id, name) WHERE deleted_at IS NULL"
                    .to_string(),
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TemplatesRepositoryConfigurations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TemplatesRepositoryConfigurations::TemplateUuid)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(
                            TemplatesRepositoryConfigurations::RepositoryConfigurationUuid,
                        )
                        .uuid()
                        .not_null(),
                    )
                    .col(
                        ColumnDef::new(TemplatesRepositoryConfigurations::DistributionHref)
                            .text()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_templates_repository_configurations")
                            .col(TemplatesRepositoryConfigurations::TemplateUuid)
                            .col(TemplatesRepositoryConfigurations::RepositoryConfigurationUuid),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_templates_repository_configurations_template")
                            .from(
                                TemplatesRepositoryConfigurations::Table,
                                TemplatesRepositoryConfigurations::TemplateUuid,
                            )
                            .to(Templates::Table, Templates::Uuid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_templates_repository_configurations_config")
                            .from(
                                TemplatesRepositoryConfigurations::Table,
                                TemplatesRepositoryConfigurations::RepositoryConfigurationUuid,
                            )
                            .to(
                                RepositoryConfigurations::Table,
                                RepositoryConfigurations::Uuid,
                            )
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(TemplatesRepositoryConfigurations::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "DROP INDEX IF EXISTS idx_templates_org_id_name".to_string(),
            ))
            .await?;

        manager
            .drop_table(Table::drop().table(Templates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Templates {
    Table,
    Uuid,
    OrgId,
    Name,
    Description,
    Arch,
    Version,
    Date,
    UseLatest,
    CreatedBy,
    LastUpdatedBy,
    LastUpdateTaskUuid,
    LastUpdateSnapshotError,
    RhsmEnvironmentCreated,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum TemplatesRepositoryConfigurations {
    Table,
    TemplateUuid,
    RepositoryConfigurationUuid,
    DistributionHref,
}
