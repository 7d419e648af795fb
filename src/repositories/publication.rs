//! Publication ledger
//!
//! Records which catalog record was registered under which DOI through which
//! server. It is the default [`PublicationCatalog`]: a server with ledger
//! rows cannot be deleted.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::doi::{self, MintSeed};
use crate::error::RegistryError;
use crate::models::doi_publication::{self, Entity as DoiPublication};
use crate::registry::collaborators::PublicationCatalog;
use crate::registry::types::DoiServerConfig;

/// Repository over the doi_publications table
#[derive(Debug, Clone)]
pub struct PublicationLedger {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl PublicationLedger {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Mints the DOI of `seed` on `server` and records it as published.
    ///
    /// Call once the external provider accepted the registration. A DOI that
    /// is already recorded is a conflict.
    pub async fn record(
        &self,
        server: &DoiServerConfig,
        seed: &MintSeed,
    ) -> Result<doi_publication::Model, RegistryError> {
        let doi = doi::mint_identifier(server, seed)?.to_string();

        let existing = DoiPublication::find()
            .filter(doi_publication::Column::Doi.eq(doi.as_str()))
            .one(&*self.db)
            .await?;
        if let Some(existing) = existing {
            return Err(RegistryError::Conflict(format!(
                "DOI {} is already recorded for record {}",
                doi, existing.record_uuid
            )));
        }

        let id = Uuid::new_v4();
        let active = doi_publication::ActiveModel {
            id: Set(id),
            doiserver_id: Set(server.id),
            record_uuid: Set(seed.uuid.trim().to_string()),
            doi: Set(doi.clone()),
            created_at: Set(Utc::now().into()),
        };
        DoiPublication::insert(active)
            .exec_without_returning(&*self.db)
            .await?;

        tracing::info!(server_id = server.id, doi = %doi, "Publication recorded");
        metrics::counter!("doi_publications_recorded_total").increment(1);

        DoiPublication::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("publication {} not persisted", id)))
    }

    /// Publications recorded through `server_id`, oldest first
    pub async fn find_by_server(
        &self,
        server_id: i32,
    ) -> Result<Vec<doi_publication::Model>, RegistryError> {
        Ok(DoiPublication::find()
            .filter(doi_publication::Column::DoiserverId.eq(server_id))
            .order_by_asc(doi_publication::Column::CreatedAt)
            .order_by_asc(doi_publication::Column::Id)
            .all(&*self.db)
            .await?)
    }
}

#[async_trait]
impl PublicationCatalog for PublicationLedger {
    async fn count_references(&self, server_id: i32) -> anyhow::Result<u64> {
        Ok(DoiPublication::find()
            .filter(doi_publication::Column::DoiserverId.eq(server_id))
            .count(&*self.db)
            .await?)
    }
}
