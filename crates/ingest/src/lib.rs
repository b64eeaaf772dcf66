//! Matchsync Ingest - pulls match history from the game API into storage.
//!
//! Two entry points share the same building blocks:
//!
//! - [`sync::SyncOrchestrator`] performs per-account incremental sync, the
//!   older-history backfill extension, the scheduled global sweep and the
//!   login-triggered check.
//! - [`backfill::BackfillJobRunner`] drives any [`backfill::BackfillJob`] in
//!   batches; [`jobs`] holds the concrete jobs and their registry.
//!
//! Progress is reported through [`sync::SyncProgressReporter`] so the host can
//! forward it to connected clients.

pub mod backfill;
pub mod errors;
pub mod jobs;
pub mod mapping;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{JobError, SyncError};
