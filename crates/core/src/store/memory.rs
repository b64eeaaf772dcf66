//! In-memory store backed by concurrent maps.
//!
//! Implements every repository trait the pipeline consumes. Single-key
//! operations are atomic; nothing here needs a multi-key transaction.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::debug;

use crate::accounts::{Account, AccountRepositoryTrait, NewAccount, SyncStatus};
use crate::authz::OwnershipCheck;
use crate::errors::{DatabaseError, Result};
use crate::matches::{MatchRecord, MatchRef, MatchRepositoryTrait};

#[derive(Default)]
pub struct InMemoryStore {
    accounts: DashMap<String, Account>,
    /// account key -> (match id -> record)
    matches: DashMap<String, BTreeMap<String, MatchRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stored match, mostly useful for assertions.
    pub fn get_match(&self, account_key: &str, match_id: &str) -> Option<MatchRecord> {
        self.matches
            .get(account_key)
            .and_then(|m| m.get(match_id).cloned())
    }

    fn with_account<F>(&self, key: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Account),
    {
        let mut entry = self
            .accounts
            .get_mut(key)
            .ok_or_else(|| DatabaseError::NotFound(format!("account {}", key)))?;
        mutate(entry.value_mut());
        Ok(())
    }
}

#[async_trait]
impl AccountRepositoryTrait for InMemoryStore {
    async fn upsert_account(&self, new_account: NewAccount) -> Result<Account> {
        new_account.validate()?;
        let key = new_account.key.clone();
        let account = self
            .accounts
            .entry(key)
            .and_modify(|existing| {
                existing.game_name = new_account.game_name.clone();
                existing.tag_line = new_account.tag_line.clone();
                existing.owner_user_id = new_account.owner_user_id.clone();
            })
            .or_insert_with(|| new_account.clone().into_account(Utc::now()))
            .clone();
        debug!("Upserted account {}", account.riot_id());
        Ok(account)
    }

    fn get_account(&self, key: &str) -> Result<Option<Account>> {
        Ok(self.accounts.get(key).map(|a| a.clone()))
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self.accounts.iter().map(|a| a.clone()).collect();
        accounts.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(accounts)
    }

    fn list_accounts_for_user(&self, user_id: &str) -> Result<Vec<Account>> {
        Ok(self
            .list_accounts()?
            .into_iter()
            .filter(|a| a.owner_user_id == user_id)
            .collect())
    }

    async fn update_sync_status(&self, key: &str, status: SyncStatus) -> Result<()> {
        self.with_account(key, |account| account.sync_status = status)
    }

    async fn try_begin_sync(&self, key: &str) -> Result<bool> {
        let mut entry = self
            .accounts
            .get_mut(key)
            .ok_or_else(|| DatabaseError::NotFound(format!("account {}", key)))?;
        if entry.sync_status == SyncStatus::Syncing {
            return Ok(false);
        }
        entry.sync_status = SyncStatus::Syncing;
        Ok(true)
    }

    async fn record_successful_sync(&self, key: &str, synced_at: DateTime<Utc>) -> Result<()> {
        self.with_account(key, |account| account.last_synced_at = Some(synced_at))
    }
}

#[async_trait]
impl MatchRepositoryTrait for InMemoryStore {
    async fn upsert_match(&self, record: MatchRecord) -> Result<()> {
        self.matches
            .entry(record.account_key.clone())
            .or_default()
            .insert(record.match_id.clone(), record);
        Ok(())
    }

    fn known_match_ids(&self, account_key: &str) -> Result<HashSet<String>> {
        Ok(self
            .matches
            .get(account_key)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn stored_match_count(&self, account_key: &str) -> Result<usize> {
        Ok(self.matches.get(account_key).map(|m| m.len()).unwrap_or(0))
    }

    fn list_match_refs(&self) -> Result<Vec<MatchRef>> {
        let mut refs: Vec<MatchRef> = self
            .matches
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .values()
                    .map(|r| r.to_ref())
                    .collect::<Vec<_>>()
            })
            .collect();
        refs.sort();
        Ok(refs)
    }
}

#[async_trait]
impl OwnershipCheck for InMemoryStore {
    async fn is_owner(&self, user_id: &str, entity_key: &str) -> Result<bool> {
        Ok(self
            .accounts
            .get(entity_key)
            .map(|a| a.owner_user_id == user_id)
            .unwrap_or(false))
    }
}
