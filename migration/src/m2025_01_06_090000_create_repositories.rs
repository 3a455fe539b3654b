//! Migration to create the repositories table.
//!
//! A repository is the org-independent record of a content source, keyed by
//! its normalized URL and carrying introspection bookkeeping.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Uuid)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Repositories::Url).text().not_null())
                    .col(
                        ColumnDef::new(Repositories::Public)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Repositories::Origin)
                            .string_len(32)
                            .not_null()
                            .default("external"),
                    )
                    .col(
                        ColumnDef::new(Repositories::Status)
                            .string_len(32)
                            .not_null()
                            .default("Pending"),
                    )
                    .col(
                        ColumnDef::new(Repositories::LastIntrospectionTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::LastIntrospectionSuccessTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::LastIntrospectionUpdateTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::LastIntrospectionError)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::FailedIntrospectionsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repositories::PackageCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repositories::RepomdChecksum)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Repositories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Repositories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_url")
                    .table(Repositories::Table)
                    .col(Repositories::Url)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_repositories_url").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Repositories {
    Table,
    Uuid,
    Url,
    Public,
    Origin,
    Status,
    LastIntrospectionTime,
    LastIntrospectionSuccessTime,
    LastIntrospectionUpdateTime,
    LastIntrospectionError,
    FailedIntrospectionsCount,
    PackageCount,
    RepomdChecksum,
    CreatedAt,
    UpdatedAt,
}
