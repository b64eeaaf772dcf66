//! Account domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Persisted sync state of a tracked account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Never synced, or last sync was cancelled
    #[default]
    Idle,
    /// A sync has been requested but has not started yet
    Pending,
    /// A sync is running
    Syncing,
    /// The last sync finished successfully
    Completed,
    /// The last sync failed
    Failed,
}

impl SyncStatus {
    /// Whether a sync for this account is already queued or running.
    pub fn is_in_flight(self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Syncing)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "idle"),
            SyncStatus::Pending => write!(f, "pending"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Completed => write!(f, "completed"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Domain model representing a tracked game account.
///
/// `key` is the stable player identifier issued by the game API (PUUID); it is
/// also the entity key used for progress subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub key: String,
    pub owner_user_id: String,
    pub game_name: String,
    pub tag_line: String,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Display handle in `name#tag` form.
    pub fn riot_id(&self) -> String {
        format!("{}#{}", self.game_name, self.tag_line)
    }
}

/// Input model for registering a tracked account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub key: String,
    pub owner_user_id: String,
    pub game_name: String,
    pub tag_line: String,
}

impl NewAccount {
    /// Validates the new account data.
    pub fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(Error::Validation("Account key cannot be empty".to_string()));
        }
        if self.owner_user_id.trim().is_empty() {
            return Err(Error::Validation("Owner cannot be empty".to_string()));
        }
        if self.game_name.trim().is_empty() || self.tag_line.trim().is_empty() {
            return Err(Error::Validation(
                "Game name and tag line are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the account row. New accounts start `Pending` so a first sync
    /// is picked up without a login-triggered double start.
    pub fn into_account(self, now: DateTime<Utc>) -> Account {
        Account {
            key: self.key,
            owner_user_id: self.owner_user_id,
            game_name: self.game_name,
            tag_line: self.tag_line,
            sync_status: SyncStatus::Pending,
            last_synced_at: None,
            created_at: now,
        }
    }
}
