//! Test utilities for database testing.
//!
//! In-memory SQLite databases with migrations applied, plus registry fixtures.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use doi_registry::crypto::{CryptoKey, Secret};
use doi_registry::registry::{
    Credentials, DoiServerDraft, DoiServerRegistry, PublicationCatalog, StaticGroupDirectory,
};
use doi_registry::repositories::DoiServerRepository;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tempfile::TempDir;

/// Groups the fixture directory knows about
pub const KNOWN_GROUPS: [i32; 3] = [1, 2, 3];

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Sets up an in-memory SQLite database with all migrations applied and returns an Arc.
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(db))
}

/// SQLite file database in `dir` served by a pool of `max_connections`.
pub async fn setup_file_db(dir: &TempDir, max_connections: u32) -> Result<Arc<DatabaseConnection>> {
    let path = dir.path().join("registry.db");
    let mut opt = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    opt.max_connections(max_connections).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    Migrator::up(&db, None).await?;
    Ok(Arc::new(db))
}

pub fn test_crypto_key() -> CryptoKey {
    CryptoKey::new(vec![42u8; 32]).expect("32-byte key")
}

pub fn test_repository(db: Arc<DatabaseConnection>) -> DoiServerRepository {
    DoiServerRepository::new(db, test_crypto_key())
}

/// Registry over `db` with the given catalog and [`KNOWN_GROUPS`]
pub fn test_registry(
    db: Arc<DatabaseConnection>,
    catalog: Arc<dyn PublicationCatalog>,
) -> DoiServerRegistry {
    DoiServerRegistry::new(
        test_repository(db),
        catalog,
        Arc::new(StaticGroupDirectory::new(KNOWN_GROUPS)),
    )
}

/// Registry over `db` that encrypts with `key` instead of [`test_crypto_key`]
pub fn test_registry_with_key(
    db: Arc<DatabaseConnection>,
    catalog: Arc<dyn PublicationCatalog>,
    key: CryptoKey,
) -> DoiServerRegistry {
    DoiServerRegistry::new(
        DoiServerRepository::new(db, key),
        catalog,
        Arc::new(StaticGroupDirectory::new(KNOWN_GROUPS)),
    )
}

/// A valid draft named `name`
pub fn sample_draft(name: &str) -> DoiServerDraft {
    DoiServerDraft::new(
        name,
        "https://mds.test.datacite.org",
        "https://catalog.example.org/records/{{uuid}}",
        "https://doi.org/",
        "10.5072",
    )
    .with_description("Test DataCite account")
    .with_credentials(Credentials::new(
        "EXAMPLE.CATALOG",
        Secret::new("s3cr3t-datacite"),
    ))
    .with_publication_groups([1, 2])
}

/// Catalog whose reference counts are set by the test
#[derive(Debug, Default)]
pub struct FakeCatalog {
    references: Mutex<HashMap<i32, u64>>,
}

impl FakeCatalog {
    pub fn set_references(&self, server_id: i32, count: u64) {
        self.references
            .lock()
            .unwrap()
            .insert(server_id, count);
    }
}

#[async_trait]
impl PublicationCatalog for FakeCatalog {
    async fn count_references(&self, server_id: i32) -> anyhow::Result<u64> {
        Ok(self
            .references
            .lock()
            .unwrap()
            .get(&server_id)
            .copied()
            .unwrap_or(0))
    }
}

/// Catalog that is unreachable
#[derive(Debug, Default)]
pub struct UnavailableCatalog;

#[async_trait]
impl PublicationCatalog for UnavailableCatalog {
    async fn count_references(&self, _server_id: i32) -> anyhow::Result<u64> {
        anyhow::bail!("catalog unavailable")
    }
}
