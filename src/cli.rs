//! # Command-line front end
//!
//! Administrative commands over the registry. Every command prints one JSON
//! document on stdout; failures print a JSON error object on stderr and exit
//! with the code of the error kind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};

use crate::config::AppConfig;
use crate::crypto::Secret;
use crate::db;
use crate::doi::{self, MintSeed};
use crate::error::RegistryError;
use crate::registry::{DoiServerDraft, DoiServerRegistry, GroupId};
use crate::repositories::{DoiServerRepository, PublicationLedger};

/// Manage the DOI servers records are published through.
#[derive(Debug, Parser)]
#[command(name = "doi-registry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending database migrations
    Migrate,
    /// List DOI servers ordered by id
    List {
        /// Only servers members of this group may publish through
        #[arg(long)]
        group: Option<GroupId>,
    },
    /// Show one DOI server by id or by name
    Show {
        #[arg(required_unless_present = "name")]
        id: Option<i32>,
        #[arg(long, conflicts_with = "id")]
        name: Option<String>,
    },
    /// Create a DOI server from a JSON draft
    Create {
        #[arg(short = 'f', long)]
        file: PathBuf,
        /// Environment variable holding the account password
        #[arg(long)]
        password_env: Option<String>,
    },
    /// Overwrite a DOI server from a JSON draft
    Update {
        id: i32,
        #[arg(short = 'f', long)]
        file: PathBuf,
        /// Environment variable holding a new account password
        #[arg(long)]
        password_env: Option<String>,
    },
    /// Replace or clear the account password only
    SetPassword {
        id: i32,
        #[arg(long, required_unless_present = "clear", conflicts_with = "clear")]
        password_env: Option<String>,
        #[arg(long)]
        clear: bool,
    },
    /// Delete a DOI server no published record references
    Delete { id: i32 },
    /// Landing page URL of an identifier suffix
    LandingPage { id: i32, suffix: String },
    /// Mint the DOI of a record
    Mint(SeedArgs),
    /// Build the input of the external registration call
    Prepare(SeedArgs),
    /// Record a DOI as published after the provider accepted it
    Record(SeedArgs),
}

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// DOI server id
    pub id: i32,
    /// Catalog record UUID
    #[arg(long)]
    pub uuid: String,
    /// Catalog record internal id
    #[arg(long)]
    pub record_id: Option<i64>,
}

impl SeedArgs {
    fn seed(&self) -> MintSeed {
        let seed = MintSeed::new(self.uuid.clone());
        match self.record_id {
            Some(record_id) => seed.with_record_id(record_id),
            None => seed,
        }
    }
}

struct Services {
    registry: DoiServerRegistry,
    ledger: PublicationLedger,
}

async fn connect(config: &AppConfig, migrate: bool) -> Result<Services> {
    let db = Arc::new(db::init_pool(config).await?);
    if migrate || config.auto_migrate {
        db::migrate(&db).await?;
    }

    let crypto_key = config.crypto_key().context("initializing crypto key")?;
    let ledger = PublicationLedger::new(db.clone());
    let registry = DoiServerRegistry::new(
        DoiServerRepository::new(db, crypto_key),
        Arc::new(ledger.clone()),
        Arc::new(config.group_directory()),
    );

    Ok(Services { registry, ledger })
}

/// Runs `command` and returns the JSON document to print.
pub async fn execute(command: &Command, config: &AppConfig) -> Result<Value> {
    let services = connect(config, matches!(command, Command::Migrate)).await?;
    let registry = &services.registry;

    let output = match command {
        Command::Migrate => json!({ "status": "migrated" }),
        Command::List { group } => {
            let servers = match group {
                Some(group) => registry.list_for_group(*group).await?,
                None => registry.list().await?,
            };
            serde_json::to_value(servers)?
        }
        Command::Show { id, name } => {
            let server = match (id, name) {
                (Some(id), _) => registry.get(*id).await?,
                (None, Some(name)) => registry.get_by_name(name).await?,
                (None, None) => anyhow::bail!("either an id or --name is required"),
            };
            serde_json::to_value(server)?
        }
        Command::Create { file, password_env } => {
            let draft = read_draft(file, password_env.as_deref()).await?;
            serde_json::to_value(registry.create(draft).await?)?
        }
        Command::Update {
            id,
            file,
            password_env,
        } => {
            let draft = read_draft(file, password_env.as_deref()).await?;
            serde_json::to_value(registry.update(*id, draft).await?)?
        }
        Command::SetPassword {
            id,
            password_env,
            clear: _,
        } => {
            let password = password_env.as_deref().map(secret_from_env).transpose()?;
            serde_json::to_value(registry.update_password(*id, password).await?)?
        }
        Command::Delete { id } => {
            registry.delete(*id).await?;
            json!({ "deleted": id })
        }
        Command::LandingPage { id, suffix } => {
            let server = registry.get(*id).await?;
            let landing_page = doi::resolve_landing_page(&server, suffix)?;
            json!({
                "server_id": id,
                "suffix": suffix,
                "landing_page": landing_page.as_str(),
            })
        }
        Command::Mint(args) => {
            let server = registry.get(args.id).await?;
            let identifier = registry.mint_for(&server, &args.seed())?;
            let public_url = doi::public_doi_url(&server, &identifier)?;
            json!({
                "server_id": args.id,
                "doi": identifier.to_string(),
                "prefix": identifier.prefix(),
                "suffix": identifier.suffix(),
                "public_url": public_url.as_str(),
            })
        }
        Command::Prepare(args) => {
            serde_json::to_value(registry.prepare_registration(args.id, &args.seed()).await?)?
        }
        Command::Record(args) => {
            let server = registry.get(args.id).await?;
            let publication = services.ledger.record(&server, &args.seed()).await?;
            json!({
                "id": publication.id,
                "server_id": publication.doiserver_id,
                "record_uuid": publication.record_uuid,
                "doi": publication.doi,
                "created_at": publication.created_at.to_rfc3339(),
            })
        }
    };

    Ok(output)
}

async fn read_draft(path: &Path, password_env: Option<&str>) -> Result<DoiServerDraft> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading draft {}", path.display()))?;
    let mut draft: DoiServerDraft = serde_json::from_str(&raw)
        .with_context(|| format!("parsing draft {}", path.display()))?;

    if let Some(var) = password_env {
        draft.credentials.password = Some(secret_from_env(var)?);
    }

    Ok(draft)
}

fn secret_from_env(var: &str) -> Result<Secret> {
    let value = std::env::var(var)
        .with_context(|| format!("password environment variable {} is not set", var))?;
    Ok(Secret::new(value))
}

/// Serializes command output for stdout.
pub fn render(output: &Value, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(output).unwrap_or_else(|_| output.to_string())
    } else {
        output.to_string()
    }
}

/// JSON error object printed on stderr.
pub fn render_error(err: &anyhow::Error) -> String {
    let (code, details) = match err.downcast_ref::<RegistryError>() {
        Some(RegistryError::Validation(errors)) => (
            "VALIDATION_FAILED",
            Some(
                errors
                    .violations
                    .iter()
                    .map(|v| json!({ "field": v.field, "message": v.message }))
                    .collect::<Vec<_>>(),
            ),
        ),
        Some(registry_err) => (registry_err.error_code(), None),
        None => ("INTERNAL_ERROR", None),
    };

    let mut body = json!({ "code": code, "message": format!("{:#}", err) });
    if let Some(details) = details {
        body["details"] = Value::Array(details);
    }
    body.to_string()
}

/// Process exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<RegistryError>()
        .map(|e| e.exit_code() as u8)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show_by_id_and_name() {
        let cli = Cli::try_parse_from(["doi-registry", "show", "100"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Show {
                id: Some(100),
                name: None
            }
        ));

        let cli = Cli::try_parse_from(["doi-registry", "show", "--name", "datacite"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Show { id: None, name: Some(ref n) } if n == "datacite"
        ));

        assert!(Cli::try_parse_from(["doi-registry", "show"]).is_err());
        assert!(Cli::try_parse_from(["doi-registry", "show", "100", "--name", "x"]).is_err());
    }

    #[test]
    fn test_parse_set_password_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["doi-registry", "set-password", "100"]).is_err());
        assert!(
            Cli::try_parse_from([
                "doi-registry",
                "set-password",
                "100",
                "--password-env",
                "X",
                "--clear"
            ])
            .is_err()
        );

        let cli = Cli::try_parse_from(["doi-registry", "set-password", "100", "--clear"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::SetPassword {
                id: 100,
                password_env: None,
                clear: true
            }
        ));
    }

    #[test]
    fn test_parse_seed_commands() {
        let cli = Cli::try_parse_from([
            "doi-registry",
            "--pretty",
            "mint",
            "101",
            "--uuid",
            "abc-123",
            "--record-id",
            "42",
        ])
        .unwrap();
        assert!(cli.pretty);

        let Command::Mint(args) = cli.command else {
            panic!("expected mint command");
        };
        assert_eq!(args.id, 101);
        assert_eq!(args.seed(), MintSeed::new("abc-123").with_record_id(42));
    }

    #[test]
    fn test_parse_create_takes_password_variable_by_name() {
        let cli = Cli::try_parse_from([
            "doi-registry",
            "create",
            "-f",
            "draft.json",
            "--password-env",
            "DATACITE_PASSWORD",
        ])
        .unwrap();

        let Command::Create { file, password_env } = cli.command else {
            panic!("expected create command");
        };
        assert_eq!(file, PathBuf::from("draft.json"));
        assert_eq!(password_env.as_deref(), Some("DATACITE_PASSWORD"));
    }

    #[test]
    fn test_render_error_lists_violations() {
        let mut errors = crate::error::ValidationErrors::new();
        errors.push("name", "is required");
        errors.push("prefix", "is required");
        let err = anyhow::Error::from(RegistryError::Validation(errors));

        let body: Value = serde_json::from_str(&render_error(&err)).unwrap();
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn test_exit_codes() {
        let not_found = anyhow::Error::from(RegistryError::NotFound("DOI server 7".into()));
        let conflict = anyhow::Error::from(RegistryError::Conflict("taken".into()));
        let other = anyhow::anyhow!("boom");

        assert_eq!(exit_code(&not_found), 3);
        assert_eq!(exit_code(&conflict), 4);
        assert_eq!(exit_code(&other), 1);
        assert!(render_error(&other).contains("INTERNAL_ERROR"));
    }
}
