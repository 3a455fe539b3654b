//! Migration to create the repository_configurations table.
//!
//! Configurations are the org-scoped, soft-deletable bindings that grant an
//! organization ownership of a repository.

use sea_orm_migration::prelude::*;

use crate::m2025_01_06_090000_create_repositories::Repositories;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RepositoryConfigurations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RepositoryConfigurations::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RepositoryConfigurations::Name)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RepositoryConfigurations::OrgId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RepositoryConfigurations::RepositoryUuid)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RepositoryConfigurations::Versions)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RepositoryConfigurations::Arch)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(RepositoryConfigurations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RepositoryConfigurations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RepositoryConfigurations::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repository_configurations_repository")
                            .from(
                                RepositoryConfigurations::Table,
                                RepositoryConfigurations::RepositoryUuid,
                            )
                            .to(Repositories::Table, Repositories::Uuid)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repository_configurations_org_id")
                    .table(RepositoryConfigurations::Table)
                    .col(RepositoryConfigurations::OrgId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repository_configurations_repository_uuid")
                    .table(RepositoryConfigurations::Table)
                    .col(RepositoryConfigurations::RepositoryUuid)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_repository_configurations_repository_uuid")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_repository_configurations_org_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .table(RepositoryConfigurations::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum RepositoryConfigurations {
    Table,
    Uuid,
    Name,
    OrgId,
    RepositoryUuid,
    Versions,
    Arch,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
