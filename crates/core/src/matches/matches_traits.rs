//! Match repository trait.

use std::collections::HashSet;

use async_trait::async_trait;

use super::matches_model::{MatchRecord, MatchRef};
use crate::errors::Result;

/// Trait defining the contract for match persistence.
#[async_trait]
pub trait MatchRepositoryTrait: Send + Sync {
    /// Inserts or replaces a match record. Idempotent per `(account_key, match_id)`.
    async fn upsert_match(&self, record: MatchRecord) -> Result<()>;

    /// Ids of every match stored for an account.
    fn known_match_ids(&self, account_key: &str) -> Result<HashSet<String>>;

    /// Number of matches stored for an account.
    fn stored_match_count(&self, account_key: &str) -> Result<usize>;

    /// Every stored match pointer, ordered by account key then match id.
    fn list_match_refs(&self) -> Result<Vec<MatchRef>>;
}
