//! Matchsync Core - Domain entities and storage contracts.
//!
//! This crate holds the types shared by the ingestion pipeline: tracked
//! accounts, stored match records, and the repository traits the pipeline
//! calls into. It is storage-agnostic; [`store::InMemoryStore`] is the
//! reference implementation used by the server and by tests.

pub mod accounts;
pub mod authz;
pub mod errors;
pub mod matches;
pub mod store;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
