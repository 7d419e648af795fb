//! # DOI Server Registry
//!
//! Owns the collection of DOI server configurations: validation, lookup,
//! lifecycle, and preparing the inputs of an external DOI-provider client.

pub mod collaborators;
pub mod types;
pub mod validation;

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use crate::crypto::Secret;
use crate::doi::{self, DoiIdentifier, MintSeed, RegistrationRequest};
use crate::error::{RegistryError, ValidationErrors};
use crate::repositories::DoiServerRepository;

pub use collaborators::{GroupDirectory, PublicationCatalog, StaticGroupDirectory};
pub use types::{Credentials, DEFAULT_IDENTIFIER_PATTERN, DoiServerConfig, DoiServerDraft, GroupId};

/// Registry service over a [`DoiServerRepository`]
#[derive(Clone)]
pub struct DoiServerRegistry {
    repository: DoiServerRepository,
    catalog: Arc<dyn PublicationCatalog>,
    groups: Arc<dyn GroupDirectory>,
}

impl DoiServerRegistry {
    pub fn new(
        repository: DoiServerRepository,
        catalog: Arc<dyn PublicationCatalog>,
        groups: Arc<dyn GroupDirectory>,
    ) -> Self {
        Self {
            repository,
            catalog,
            groups,
        }
    }

    pub fn repository(&self) -> &DoiServerRepository {
        &self.repository
    }

    /// Validates `draft`, assigns a new identifier and persists it.
    pub async fn create(&self, draft: DoiServerDraft) -> Result<DoiServerConfig, RegistryError> {
        let draft = draft.normalized();
        validation::validate_draft(&draft)?;
        self.check_groups(&draft).await?;

        if self.repository.name_in_use(&draft.name, None).await? {
            return Err(duplicate_name(&draft.name));
        }

        let created = self.repository.insert(&draft).await?;

        info!(
            server_id = created.id,
            name = %created.name,
            prefix = %created.prefix,
            groups = created.publication_groups.len(),
            "DOI server created"
        );
        counter!("doi_servers_created_total").increment(1);

        Ok(created)
    }

    /// Overwrites every mutable field of server `id`.
    ///
    /// A draft without a password keeps the stored one.
    pub async fn update(
        &self,
        id: i32,
        draft: DoiServerDraft,
    ) -> Result<DoiServerConfig, RegistryError> {
        if !self.repository.exists(id).await? {
            return Err(not_found(id));
        }

        let draft = draft.normalized();
        validation::validate_draft(&draft)?;
        self.check_groups(&draft).await?;

        if self.repository.name_in_use(&draft.name, Some(id)).await? {
            return Err(duplicate_name(&draft.name));
        }

        let updated = self.repository.update(id, &draft).await?;

        info!(
            server_id = updated.id,
            name = %updated.name,
            password_changed = draft.credentials.password.is_some(),
            "DOI server updated"
        );
        counter!("doi_servers_updated_total").increment(1);

        Ok(updated)
    }

    /// Replaces (or with `None`, clears) only the account secret.
    pub async fn update_password(
        &self,
        id: i32,
        password: Option<Secret>,
    ) -> Result<DoiServerConfig, RegistryError> {
        if let Some(password) = &password {
            validation::validate_password(password.expose())?;
        }

        let updated = self
            .repository
            .update_password(id, password.as_ref())
            .await?
            .ok_or_else(|| not_found(id))?;

        info!(
            server_id = id,
            cleared = password.is_none(),
            "DOI server password updated"
        );
        counter!("doi_servers_updated_total").increment(1);

        Ok(updated)
    }

    pub async fn get(&self, id: i32) -> Result<DoiServerConfig, RegistryError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<DoiServerConfig, RegistryError> {
        self.repository
            .find_by_name(name.trim())
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("DOI server named '{}'", name)))
    }

    /// All servers ordered by id
    pub async fn list(&self) -> Result<Vec<DoiServerConfig>, RegistryError> {
        self.repository.find_all().await
    }

    /// Servers members of `group` may publish through
    pub async fn list_for_group(
        &self,
        group: GroupId,
    ) -> Result<Vec<DoiServerConfig>, RegistryError> {
        self.repository.find_by_group(group).await
    }

    /// Deletes server `id` unless a published record still references it.
    pub async fn delete(&self, id: i32) -> Result<(), RegistryError> {
        if !self.repository.exists(id).await? {
            return Err(not_found(id));
        }

        let references = self.catalog.count_references(id).await?;
        if references > 0 {
            warn!(
                server_id = id,
                references, "Refusing to delete DOI server referenced by published records"
            );
            return Err(RegistryError::Conflict(format!(
                "DOI server {} is referenced by {} published record(s)",
                id, references
            )));
        }

        if !self.repository.delete(id).await? {
            return Err(not_found(id));
        }

        info!(server_id = id, "DOI server deleted");
        counter!("doi_servers_deleted_total").increment(1);

        Ok(())
    }

    /// Mints the DOI of a record on server `id`
    pub async fn mint(&self, id: i32, seed: &MintSeed) -> Result<DoiIdentifier, RegistryError> {
        let config = self.get(id).await?;
        self.mint_for(&config, seed)
    }

    /// Mints the DOI of a record on an already loaded server
    pub fn mint_for(
        &self,
        config: &DoiServerConfig,
        seed: &MintSeed,
    ) -> Result<DoiIdentifier, RegistryError> {
        let doi = doi::mint_identifier(config, seed)?;

        debug!(server_id = config.id, doi = %doi, "DOI minted");
        counter!("doi_identifiers_minted_total").increment(1);

        Ok(doi)
    }

    /// Full input of the external registration call for a record on server `id`
    pub async fn prepare_registration(
        &self,
        id: i32,
        seed: &MintSeed,
    ) -> Result<RegistrationRequest, RegistryError> {
        let config = self.get(id).await?;
        let request = RegistrationRequest::build(&config, seed)?;

        if request.password.is_none() {
            warn!(server_id = id, "DOI server has no password configured");
        }
        debug!(server_id = id, doi = %request.doi, "Registration request prepared");
        counter!("doi_identifiers_minted_total").increment(1);

        Ok(request)
    }

    async fn check_groups(&self, draft: &DoiServerDraft) -> Result<(), RegistryError> {
        if draft.publication_groups.is_empty() {
            return Ok(());
        }

        let unknown = self
            .groups
            .unknown_groups(&draft.publication_groups)
            .await?;
        if unknown.is_empty() {
            return Ok(());
        }

        let listed = unknown
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(RegistryError::Validation(ValidationErrors::single(
            "publication_groups",
            format!("unknown group id(s): {}", listed),
        )))
    }
}

fn not_found(id: i32) -> RegistryError {
    RegistryError::NotFound(format!("DOI server {}", id))
}

fn duplicate_name(name: &str) -> RegistryError {
    RegistryError::Conflict(format!("a DOI server named '{}' already exists", name))
}
