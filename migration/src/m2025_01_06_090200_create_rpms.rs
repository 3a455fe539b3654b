//! Migration to create the rpms table and the repositories_rpms join table.
//!
//! Package rows are shared across repositories and keyed by their content
//! checksum; membership lives in the join table.

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
                    .table(Rpms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rpms::Uuid).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Rpms::Checksum).string_len(255).not_null())
                    .col(ColumnDef::new(Rpms::Name).text().not_null())
                    .col(ColumnDef::new(Rpms::Arch).text().not_null())
                    .col(ColumnDef::new(Rpms::Version).text().not_null())
                    .col(ColumnDef::new(Rpms::Release).text().not_null())
                    .col(ColumnDef::new(Rpms::Epoch).integer().not_null().default(0))
                    .col(ColumnDef::new(Rpms::Summary).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Rpms::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Checksum uniqueness backs the insert-ignore-conflict ingestion path
        manager
            .create_index(
                Index::create()
                    .name("idx_rpms_checksum")
                    .table(Rpms::Table)
                    .col(Rpms::Checksum)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rpms_name")
                    .table(Rpms::Table)
                    .col(Rpms::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RepositoriesRpms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RepositoriesRpms::RepositoryUuid)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RepositoriesRpms::RpmUuid).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_repositories_rpms")
                            .col(RepositoriesRpms::RepositoryUuid)
                            .col(RepositoriesRpms::RpmUuid),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repositories_rpms_repository")
                            .from(RepositoriesRpms::Table, RepositoriesRpms::RepositoryUuid)
                            .to(Repositories::Table, Repositories::Uuid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repositories_rpms_rpm")
                            .from(RepositoriesRpms::Table, RepositoriesRpms::RpmUuid)
                            .to(Rpms::Table, Rpms::Uuid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_rpms_rpm_uuid")
                    .table(RepositoriesRpms::Table)
                    .col(RepositoriesRpms::RpmUuid)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RepositoriesRpms::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Rpms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Rpms {
    Table,
    Uuid,
    Checksum,
    Name,
    Arch,
    Version,
    Release,
    Epoch,
    Summary,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RepositoriesRpms {
    Table,
    RepositoryUuid,
    RpmUuid,
}
