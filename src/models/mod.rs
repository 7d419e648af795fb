//! # Data Models
//!
//! SeaORM entities backing the DOI server registry.

pub mod doi_publication;
pub mod doi_server;
pub mod doi_server_group;

pub use doi_publication::Entity as DoiPublication;
pub use doi_server::Entity as DoiServer;
pub use doi_server_group::Entity as DoiServerGroup;
