//! Join rows between DOI servers and the authorization groups allowed to
//! publish through them.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "doiservers_group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub doiserver_id: i32,

    /// Group identifier owned by the surrounding catalog
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::doi_server::Entity",
        from = "Column::DoiserverId",
        to = "super::doi_server::Column::Id",
        on_delete = "Cascade"
    )]
    DoiServer,
}

impl Related<super::doi_server::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DoiServer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
