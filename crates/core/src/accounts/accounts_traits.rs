//! Account repository trait.
//!
//! The ingestion pipeline only depends on this contract; concrete storage is
//! provided by the host application.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::accounts_model::{Account, NewAccount, SyncStatus};
use crate::errors::Result;

/// Trait defining the contract for tracked-account persistence.
///
/// All writes are idempotent: repeating a call with the same arguments leaves
/// the store in the same state.
#[async_trait]
pub trait AccountRepositoryTrait: Send + Sync {
    /// Registers an account, or refreshes the display fields of an existing one.
    async fn upsert_account(&self, new_account: NewAccount) -> Result<Account>;

    /// Retrieves an account by its key.
    fn get_account(&self, key: &str) -> Result<Option<Account>>;

    /// Lists every tracked account, ordered by key.
    fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Lists the accounts owned by a user.
    fn list_accounts_for_user(&self, user_id: &str) -> Result<Vec<Account>>;

    /// Sets the persisted sync status of an account.
    async fn update_sync_status(&self, key: &str, status: SyncStatus) -> Result<()>;

    /// Atomically moves an account to `syncing` unless it is already there.
    ///
    /// Returns false when another sync holds the account. `pending` may be
    /// claimed: it marks a sync that was queued but has not started.
    async fn try_begin_sync(&self, key: &str) -> Result<bool>;

    /// Records the timestamp of the last successful sync.
    async fn record_successful_sync(&self, key: &str, synced_at: DateTime<Utc>) -> Result<()>;
}
