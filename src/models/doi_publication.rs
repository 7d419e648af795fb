//! Publication ledger entity model
//!
//! Each row records that a catalog record was registered under a DOI through
//! a given server. Rows pin their server: it cannot be deleted while any
//! exist.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "doi_publications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub doiserver_id: i32,

    /// UUID of the published catalog record
    pub record_uuid: String,

    /// Full DOI, `prefix/suffix`
    #[sea_orm(unique)]
    pub doi: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::doi_server::Entity",
        from = "Column::DoiserverId",
        to = "super::doi_server::Column::Id",
        on_delete = "Restrict"
    )]
    DoiServer,
}

impl Related<super::doi_server::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DoiServer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
