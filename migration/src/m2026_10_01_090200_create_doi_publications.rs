//! Migration to create the doi_publications table.
//!
//! Ledger of DOIs registered through a server. A server with ledger rows
//! cannot be deleted.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DoiPublications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DoiPublications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DoiPublications::DoiserverId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DoiPublications::RecordUuid).text().not_null())
                    .col(ColumnDef::new(DoiPublications::Doi).text().not_null())
                    .col(
                        ColumnDef::new(DoiPublications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_doi_publications_doiserver_id")
                            .from(DoiPublications::Table, DoiPublications::DoiserverId)
                            .to(Doiservers::Table, Doiservers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_doi_publications_doi")
                    .table(DoiPublications::Table)
                    .col(DoiPublications::Doi)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_doi_publications_doiserver_id")
                    .table(DoiPublications::Table)
                    .col(DoiPublications::DoiserverId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_doi_publications_doi").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_doi_publications_doiserver_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(DoiPublications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DoiPublications {
    Table,
    Id,
    DoiserverId,
    RecordUuid,
    Doi,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Doiservers {
    Table,
    Id,
}
