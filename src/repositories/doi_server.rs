//! DOI server repository for database operations
//!
//! This module provides the DoiServerRepository struct which encapsulates
//! SeaORM operations for the doiservers table and its group links, and
//! encrypts account secrets on write and decrypts them on read.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::crypto::{
    CryptoKey, Secret, decrypt_doi_server_password, encrypt_doi_server_password,
    is_legacy_plaintext,
};
use crate::error::RegistryError;
use crate::models::doi_server::{self, Entity as DoiServer};
use crate::models::doi_server_group::{self, Entity as DoiServerGroup};
use crate::registry::types::{Credentials, DoiServerConfig, DoiServerDraft, GroupId};

/// First identifier the doiservers sequence hands out (see the migration)
pub const FIRST_SERVER_ID: i32 = 100;

/// Repository for DOI server database operations
#[derive(Debug, Clone)]
pub struct DoiServerRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Key for account secret encryption
    pub crypto_key: CryptoKey,
}

impl DoiServerRepository {
    /// Creates a new DoiServerRepository instance
    pub fn new(db: Arc<DatabaseConnection>, crypto_key: CryptoKey) -> Self {
        Self { db, crypto_key }
    }

    /// Finds a server by id, with its publication groups and decrypted secret
    pub async fn find_by_id(&self, id: i32) -> Result<Option<DoiServerConfig>, RegistryError> {
        let Some(model) = DoiServer::find_by_id(id).one(&*self.db).await? else {
            return Ok(None);
        };
        let groups = load_groups(&*self.db, id).await?;
        Ok(Some(self.to_config(model, groups)))
    }

    /// Whether server `id` exists; never touches the stored secret
    pub async fn exists(&self, id: i32) -> Result<bool, RegistryError> {
        Ok(DoiServer::find_by_id(id).count(&*self.db).await? > 0)
    }

    /// Finds a server by its unique name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<DoiServerConfig>, RegistryError> {
        let Some(model) = DoiServer::find()
            .filter(doi_server::Column::Name.eq(name))
            .one(&*self.db)
            .await?
        else {
            return Ok(None);
        };
        let groups = load_groups(&*self.db, model.id).await?;
        Ok(Some(self.to_config(model, groups)))
    }

    /// Lists every server ordered by id
    pub async fn find_all(&self) -> Result<Vec<DoiServerConfig>, RegistryError> {
        let models = DoiServer::find()
            .order_by_asc(doi_server::Column::Id)
            .all(&*self.db)
            .await?;

        let mut links: BTreeMap<i32, BTreeSet<GroupId>> = BTreeMap::new();
        for link in DoiServerGroup::find().all(&*self.db).await? {
            links
                .entry(link.doiserver_id)
                .or_default()
                .insert(link.group_id);
        }

        Ok(models
            .into_iter()
            .map(|model| {
                let groups = links.remove(&model.id).unwrap_or_default();
                self.to_config(model, groups)
            })
            .collect())
    }

    /// Lists the servers whose publication groups contain `group_id`
    pub async fn find_by_group(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<DoiServerConfig>, RegistryError> {
        let server_ids: Vec<i32> = DoiServerGroup::find()
            .filter(doi_server_group::Column::GroupId.eq(group_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|link| link.doiserver_id)
            .collect();

        if server_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = DoiServer::find()
            .filter(doi_server::Column::Id.is_in(server_ids))
            .order_by_asc(doi_server::Column::Id)
            .all(&*self.db)
            .await?;

        let mut configs = Vec::with_capacity(models.len());
        for model in models {
            let groups = load_groups(&*self.db, model.id).await?;
            configs.push(self.to_config(model, groups));
        }
        Ok(configs)
    }

    /// Whether `name` is taken by a server other than `excluding`
    pub async fn name_in_use(
        &self,
        name: &str,
        excluding: Option<i32>,
    ) -> Result<bool, RegistryError> {
        let mut query = DoiServer::find().filter(doi_server::Column::Name.eq(name));
        if let Some(id) = excluding {
            query = query.filter(doi_server::Column::Id.ne(id));
        }
        Ok(query.one(&*self.db).await?.is_some())
    }

    /// Inserts a server under the next identifier of the table's sequence.
    ///
    /// The secret is bound to the row id, so it is written once the row exists.
    pub async fn insert(&self, draft: &DoiServerDraft) -> Result<DoiServerConfig, RegistryError> {
        let txn = self.db.begin().await?;

        let now = Utc::now();
        let active = doi_server::ActiveModel {
            name: Set(draft.name.clone()),
            description: Set(draft.description.clone()),
            api_url: Set(draft.api_url.clone()),
            username: Set(draft.credentials.username.clone()),
            password_ciphertext: Set(None),
            landing_page_template: Set(draft.landing_page_template.clone()),
            public_url: Set(draft.public_url.clone()),
            identifier_pattern: Set(draft.identifier_pattern.clone()),
            prefix: Set(draft.prefix.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let id = DoiServer::insert(active).exec(&txn).await?.last_insert_id;

        if let Some(password) = &draft.credentials.password {
            let secret = doi_server::ActiveModel {
                id: Unchanged(id),
                password_ciphertext: Set(self.encrypt_password(id, Some(password))?),
                ..Default::default()
            };
            secret.update(&txn).await?;
        }
        replace_groups(&txn, id, &draft.publication_groups).await?;

        txn.commit().await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("DOI server {} not persisted", id)))
    }

    /// Overwrites the mutable fields of server `id` and replaces its group links.
    ///
    /// The stored secret is kept when the draft carries no password.
    pub async fn update(
        &self,
        id: i32,
        draft: &DoiServerDraft,
    ) -> Result<DoiServerConfig, RegistryError> {
        let txn = self.db.begin().await?;

        let mut active = doi_server::ActiveModel {
            id: Unchanged(id),
            name: Set(draft.name.clone()),
            description: Set(draft.description.clone()),
            api_url: Set(draft.api_url.clone()),
            username: Set(draft.credentials.username.clone()),
            landing_page_template: Set(draft.landing_page_template.clone()),
            public_url: Set(draft.public_url.clone()),
            identifier_pattern: Set(draft.identifier_pattern.clone()),
            prefix: Set(draft.prefix.clone()),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(password) = &draft.credentials.password {
            active.password_ciphertext = Set(self.encrypt_password(id, Some(password))?);
        }
        match active.update(&txn).await {
            Ok(_) => {}
            Err(DbErr::RecordNotUpdated) => return Err(not_found(id)),
            Err(err) => return Err(err.into()),
        }

        replace_groups(&txn, id, &draft.publication_groups).await?;

        txn.commit().await?;

        self.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    /// Replaces or clears the secret of server `id`; `None` when it does not exist
    pub async fn update_password(
        &self,
        id: i32,
        password: Option<&Secret>,
    ) -> Result<Option<DoiServerConfig>, RegistryError> {
        let active = doi_server::ActiveModel {
            id: Unchanged(id),
            password_ciphertext: Set(self.encrypt_password(id, password)?),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        match active.update(&*self.db).await {
            Ok(_) => self.find_by_id(id).await,
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes server `id` and its group links; `false` when nothing was deleted
    pub async fn delete(&self, id: i32) -> Result<bool, RegistryError> {
        let txn = self.db.begin().await?;

        DoiServerGroup::delete_many()
            .filter(doi_server_group::Column::DoiserverId.eq(id))
            .exec(&txn)
            .await?;
        let result = DoiServer::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }

    /// Encrypts every secret still stored as legacy plaintext.
    ///
    /// Returns the ids of the affected servers; with `dry_run` nothing is
    /// written.
    pub async fn reencrypt_legacy_passwords(
        &self,
        dry_run: bool,
    ) -> Result<Vec<i32>, RegistryError> {
        let models = DoiServer::find()
            .filter(doi_server::Column::PasswordCiphertext.is_not_null())
            .order_by_asc(doi_server::Column::Id)
            .all(&*self.db)
            .await?;

        let mut affected = Vec::new();
        for model in models {
            let Some(payload) = model.password_ciphertext.as_ref() else {
                continue;
            };
            if !is_legacy_plaintext(payload) {
                continue;
            }

            affected.push(model.id);
            if dry_run {
                continue;
            }

            let id = model.id;
            let plaintext = decrypt_doi_server_password(&self.crypto_key, id, payload)?;
            let mut active: doi_server::ActiveModel = model.into();
            active.password_ciphertext = Set(self.encrypt_password(id, Some(&plaintext))?);
            active.updated_at = Set(Utc::now().into());
            active.update(&*self.db).await?;

            tracing::info!(server_id = id, "Re-encrypted legacy plaintext password");
        }

        Ok(affected)
    }

    fn encrypt_password(
        &self,
        id: i32,
        password: Option<&Secret>,
    ) -> Result<Option<Vec<u8>>, RegistryError> {
        password
            .map(|secret| encrypt_doi_server_password(&self.crypto_key, id, secret))
            .transpose()
            .map_err(RegistryError::from)
    }

    /// Builds the domain record. A secret that cannot be decrypted does not
    /// fail the read; it is reported through `Credentials::password_unreadable`.
    fn to_config(
        &self,
        model: doi_server::Model,
        publication_groups: BTreeSet<GroupId>,
    ) -> DoiServerConfig {
        let mut password_unreadable = false;
        let password = match model.password_ciphertext.as_deref() {
            Some(payload) if !payload.is_empty() => {
                if is_legacy_plaintext(payload) {
                    tracing::warn!(
                        server_id = model.id,
                        "Legacy plaintext password detected, consider running reencrypt_doi_passwords"
                    );
                }
                match decrypt_doi_server_password(&self.crypto_key, model.id, payload) {
                    Ok(secret) => Some(secret),
                    Err(err) => {
                        // Generic message only, the payload stays out of the logs
                        tracing::error!(
                            server_id = model.id,
                            error = %err,
                            "Password decryption failed"
                        );
                        password_unreadable = true;
                        None
                    }
                }
            }
            _ => None,
        };

        DoiServerConfig {
            id: model.id,
            name: model.name,
            description: model.description,
            api_url: model.api_url,
            credentials: Credentials {
                username: model.username,
                password,
                password_unreadable,
            },
            landing_page_template: model.landing_page_template,
            public_url: model.public_url,
            identifier_pattern: model.identifier_pattern,
            prefix: model.prefix,
            publication_groups,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

async fn load_groups<C: ConnectionTrait>(
    conn: &C,
    server_id: i32,
) -> Result<BTreeSet<GroupId>, RegistryError> {
    Ok(DoiServerGroup::find()
        .filter(doi_server_group::Column::DoiserverId.eq(server_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|link| link.group_id)
        .collect())
}

async fn replace_groups<C: ConnectionTrait>(
    conn: &C,
    server_id: i32,
    groups: &BTreeSet<GroupId>,
) -> Result<(), RegistryError> {
    DoiServerGroup::delete_many()
        .filter(doi_server_group::Column::DoiserverId.eq(server_id))
        .exec(conn)
        .await?;

    for group_id in groups {
        let link = doi_server_group::ActiveModel {
            doiserver_id: Set(server_id),
            group_id: Set(*group_id),
        };
        DoiServerGroup::insert(link)
            .exec_without_returning(conn)
            .await?;
    }

    Ok(())
}

fn not_found(id: i32) -> RegistryError {
    RegistryError::NotFound(format!("DOI server {}", id))
}
