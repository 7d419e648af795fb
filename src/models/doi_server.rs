//! DOI server entity model
//!
//! This module contains the SeaORM entity model for the doiservers table,
//! one row per configured DOI registration endpoint.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// DOI server row. The account secret is only ever held as ciphertext here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "doiservers")]
pub struct Model {
    /// Identifier from the table's sequence, starting at 100
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Unique short label
    #[sea_orm(unique)]
    pub name: String,

    pub description: Option<String>,

    /// Endpoint of the provider's registration API
    pub api_url: String,

    pub username: Option<String>,

    /// Versioned AES-256-GCM payload, see [`crate::crypto`]
    pub password_ciphertext: Option<Vec<u8>>,

    pub landing_page_template: String,

    pub public_url: String,

    pub identifier_pattern: String,

    /// Registrant DOI prefix, e.g. `10.5072`
    pub prefix: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::doi_server_group::Entity")]
    PublicationGroups,
    #[sea_orm(has_many = "super::doi_publication::Entity")]
    Publications,
}

impl Related<super::doi_server_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PublicationGroups.def()
    }
}

impl Related<super::doi_publication::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Publications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
