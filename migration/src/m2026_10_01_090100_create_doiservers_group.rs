//! Migration to create the doiservers_group join table.
//!
//! Links a DOI server to the authorization groups allowed to publish through
//! it. Groups belong to the surrounding catalog, so `group_id` carries no
//! foreign key.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DoiserversGroup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DoiserversGroup::DoiserverId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DoiserversGroup::GroupId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(DoiserversGroup::DoiserverId)
                            .col(DoiserversGroup::GroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_doiservers_group_doiserver_id")
                            .from(DoiserversGroup::Table, DoiserversGroup::DoiserverId)
                            .to(Doiservers::Table, Doiservers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookup of the servers a group may publish through
        manager
            .create_index(
                Index::create()
                    .name("idx_doiservers_group_group_id")
                    .table(DoiserversGroup::Table)
                    .col(DoiserversGroup::GroupId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_doiservers_group_group_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(DoiserversGroup::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DoiserversGroup {
    Table,
    DoiserverId,
    GroupId,
}

#[derive(DeriveIden)]
enum Doiservers {
    Table,
    Id,
}
