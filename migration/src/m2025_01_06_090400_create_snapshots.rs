//! Migration to create the snapshots table.
//!
//! Snapshots are immutable captures of a repository configuration's content,
//! referencing versions held by the external content service.

use sea_orm_migration::prelude::*;

use crate::m2025_01_06_090100_create_repository_configurations::RepositoryConfigurations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Snapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Snapshots::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Snapshots::RepositoryConfigurationUuid)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Snapshots::VersionHref).text().not_null())
                    .col(
                        ColumnDef::new(Snapshots::PublicationHref)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Snapshots::DistributionPath)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Snapshots::DistributionHref)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Snapshots::ContentCounts).json_binary().not_null())
                    .col(ColumnDef::new(Snapshots::AddedCounts).json_binary().not_null())
                    .col(ColumnDef::new(Snapshots::RemovedCounts).json_binary().not_null())
                    .col(
                        ColumnDef::new(Snapshots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_snapshots_repository_configuration")
                            .from(Snapshots::Table, Snapshots::RepositoryConfigurationUuid)
                            .to(
                                RepositoryConfigurations::Table,
                                RepositoryConfigurations::Uuid,
                            )
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_snapshots_configuration_created_at")
                    .table(Snapshots::Table)
                    .col(Snapshots::RepositoryConfigurationUuid)
                    .col(Snapshots::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_snapshots_configuration_created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Snapshots::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Snapshots {
    Table,
    Uuid,
    RepositoryConfigurationUuid,
    VersionHref,
    PublicationHref,
    DistributionPath,
    DistributionHref,
    ContentCounts,
    AddedCounts,
    RemovedCounts,
    CreatedAt,
}
