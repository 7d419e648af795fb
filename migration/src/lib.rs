//! Database migrations for the DOI server registry.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_10_01_090000_create_doiservers;
mod m2026_10_01_090100_create_doiservers_group;
mod m2026_10_01_090200_create_doi_publications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_10_01_090000_create_doiservers::Migration),
            Box::new(m2026_10_01_090100_create_doiservers_group::Migration),
            Box::new(m2026_10_01_090200_create_doi_publications::Migration),
        ]
    }
}
