//! Migration to create module stream metadata and its repository associations.

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
                    .table(ModuleStreams::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModuleStreams::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ModuleStreams::Name).text().not_null())
                    .col(ColumnDef::new(ModuleStreams::Stream).text().not_null())
                    .col(ColumnDef::new(ModuleStreams::Version).text().not_null())
                    .col(ColumnDef::new(ModuleStreams::Context).text().not_null())
                    .col(ColumnDef::new(ModuleStreams::Arch).text().not_null())
                    .col(
                        ColumnDef::new(ModuleStreams::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ModuleStreams::PackageNames)
                            .json_binary()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RepositoriesModuleStreams::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RepositoriesModuleStreams::RepositoryUuid)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RepositoriesModuleStreams::ModuleStreamUuid)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_repositories_module_streams")
                            .col(RepositoriesModuleStreams::RepositoryUuid)
                            .col(RepositoriesModuleStreams::ModuleStreamUuid),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repositories_module_streams_repository")
                            .from(
                                RepositoriesModuleStreams::Table,
                                RepositoriesModuleStreams::RepositoryUuid,
                            )
                            .to(Repositories::Table, Repositories::Uuid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repositories_module_streams_stream")
                            .from(
                                RepositoriesModuleStreams::Table,
                                RepositoriesModuleStreams::ModuleStreamUuid,
                            )
                            .to(ModuleStreams::Table, ModuleStreams::Uuid)
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
                    .table(RepositoriesModuleStreams::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ModuleStreams::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ModuleStreams {
    Table,
    Uuid,
    Name,
    Stream,
    Version,
    Context,
    Arch,
    Description,
    PackageNames,
}

#[derive(DeriveIden)]
enum RepositoriesModuleStreams {
    Table,
    RepositoryUuid,
    ModuleStreamUuid,
}
