//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for the
//! registry's tables.

pub mod doi_server;
pub mod publication;

pub use doi_server::DoiServerRepository;
pub use publication::PublicationLedger;
