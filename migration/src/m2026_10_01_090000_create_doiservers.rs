//! Migration to create the doiservers table.
//!
//! One row per configured DOI registration endpoint. The account secret is
//! stored as ciphertext; names are unique across the registry. Ids come from
//! the table's own sequence, start at 100 and are never reused.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{DatabaseBackend, Statement};

const FIRST_ID: i32 = 100;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Doiservers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Doiservers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Doiservers::Name).string_len(32).not_null())
                    .col(ColumnDef::new(Doiservers::Description).string_len(255).null())
                    .col(ColumnDef::new(Doiservers::ApiUrl).string_len(255).not_null())
                    .col(ColumnDef::new(Doiservers::Username).string_len(128).null())
                    .col(ColumnDef::new(Doiservers::PasswordCiphertext).binary().null())
                    .col(
                        ColumnDef::new(Doiservers::LandingPageTemplate)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Doiservers::PublicUrl).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Doiservers::IdentifierPattern)
                            .string_len(255)
                            .not_null()
                            .default("{{uuid}}"),
                    )
                    .col(ColumnDef::new(Doiservers::Prefix).string_len(15).not_null())
                    .col(
                        ColumnDef::new(Doiservers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Doiservers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_doiservers_name")
                    .table(Doiservers::Table)
                    .col(Doiservers::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        start_sequence(manager).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_doiservers_name").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Doiservers::Table).to_owned())
            .await
    }
}

/// Makes the first generated id `FIRST_ID`
async fn start_sequence(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    let backend = manager.get_database_backend();
    let sql = match backend {
        DatabaseBackend::Postgres => format!(
            "SELECT setval(pg_get_serial_sequence('doiservers', 'id'), {}, false)",
            FIRST_ID
        ),
        DatabaseBackend::MySql => format!("ALTER TABLE doiservers AUTO_INCREMENT = {}", FIRST_ID),
        // AUTOINCREMENT keeps the highest id ever used in sqlite_sequence
        DatabaseBackend::Sqlite => format!(
            "INSERT INTO sqlite_sequence (name, seq) VALUES ('doiservers', {})",
            FIRST_ID - 1
        ),
    };

    manager
        .get_connection()
        .execute(Statement::from_string(backend, sql))
        .await
        .map(|_| ())
}

#[derive(DeriveIden)]
enum Doiservers {
    Table,
    Id,
    Name,
    Description,
    ApiUrl,
    Username,
    PasswordCiphertext,
    LandingPageTemplate,
    PublicUrl,
    IdentifierPattern,
    Prefix,
    CreatedAt,
    UpdatedAt,
}
