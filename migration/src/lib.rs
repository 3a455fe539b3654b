//! Database migrations for the content sources catalog.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_06_090000_create_repositories;
mod m2025_01_06_090100_create_repository_configurations;
mod m2025_01_06_090200_create_rpms;
mod m2025_01_06_090300_create_templates;
mod m2025_01_06_090400_create_snapshots;
mod m2025_01_06_090500_create_module_streams;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_06_090000_create_repositories::Migration),
            Box::new(m2025_01_06_090100_create_repository_configurations::Migration),
            Box::new(m2025_01_06_090200_create_rpms::Migration),
            Box::new(m2025_01_06_090300_create_templates::Migration),
            Box::new(m2025_01_06_090400_create_snapshots::Migration),
            Box::new(m2025_01_06_090500_create_module_streams::Migration),
        ]
    }
}
