use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use doi_registry::{config::ConfigLoader, db, repositories::DoiServerRepository, telemetry};

/// Encrypt DOI server passwords still stored as legacy plaintext.
#[derive(Debug, Parser)]
#[command(name = "reencrypt_doi_passwords")]
struct Args {
    /// Report affected servers without writing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing telemetry")?;

    let crypto_key = config.crypto_key().context("initializing crypto key")?;

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    let repository = DoiServerRepository::new(Arc::new(db), crypto_key);
    let affected = repository
        .reencrypt_legacy_passwords(args.dry_run)
        .await
        .context("re-encrypting legacy passwords")?;

    if args.dry_run {
        println!(
            "{} DOI server(s) hold legacy plaintext passwords: {:?}",
            affected.len(),
            affected
        );
    } else {
        println!(
            "Re-encrypted {} DOI server(s) containing legacy plaintext passwords.",
            affected.len()
        );
    }

    Ok(())
}
