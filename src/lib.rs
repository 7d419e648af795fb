//! # DOI Server Registry
//!
//! Stores the configurations of the external DOI-provider accounts a catalog
//! registers records with, mints identifiers from them, and resolves landing
//! pages.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod db;
pub mod doi;
pub mod error;
pub mod models;
pub mod registry;
pub mod repositories;
pub mod telemetry;
pub mod template;
pub use migration;

pub use doi::{DoiIdentifier, MintSeed, RegistrationRequest};
pub use error::{RegistryError, ValidationErrors};
pub use registry::{DoiServerConfig, DoiServerDraft, DoiServerRegistry};
