//! Sync orchestrator.
//!
//! Owns the per-account sync algorithm and the two ways it is triggered in
//! bulk: the scheduled global sweep and the login-time check.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use matchsync_core::accounts::{Account, AccountRepositoryTrait, SyncStatus};
use matchsync_core::matches::MatchRepositoryTrait;
use matchsync_game_api::GameApiGateway;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::config::SyncConfig;
use super::cursor::SyncCursor;
use super::guard::{CooldownTracker, SingleFlight};
use super::progress::{SyncProgressEvent, SyncProgressReporter};
use crate::errors::SyncError;
use crate::mapping::to_match_record;

/// Outcome of one successful account sync.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountSyncSummary {
    pub account_key: String,
    /// Matches found by the incremental pass.
    pub new_matches: usize,
    /// Older matches found by the backfill extension.
    pub backfilled_matches: usize,
    /// Matches stored for the account afterwards.
    pub stored_total: usize,
}

impl AccountSyncSummary {
    pub fn total_synced(&self) -> usize {
        self.new_matches + self.backfilled_matches
    }
}

/// Outcome of a global sweep.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub accounts_synced: usize,
    pub accounts_failed: usize,
    pub accounts_skipped: usize,
    pub matches_ingested: usize,
    pub cancelled: bool,
}

/// Outcome of a login-triggered check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginCheckOutcome {
    Synced(AccountSyncSummary),
    /// The account was checked within the cooldown window.
    SkippedCooldown,
    /// A sync is already queued or running for the account.
    SkippedInFlight,
}

/// Orchestrates match synchronization for tracked accounts.
///
/// ```ignore
/// let orchestrator = SyncOrchestrator::new(store.clone(), store, gateway, reporter, SyncConfig::default());
/// let summary = orchestrator.run_sync("puuid", &cancel).await?;
/// ```
pub struct SyncOrchestrator<P: SyncProgressReporter> {
    accounts: Arc<dyn AccountRepositoryTrait>,
    matches: Arc<dyn MatchRepositoryTrait>,
    gateway: Arc<dyn GameApiGateway>,
    progress_reporter: Arc<P>,
    config: SyncConfig,
    sweep_lock: SingleFlight,
    login_cooldown: CooldownTracker,
}

impl<P: SyncProgressReporter> SyncOrchestrator<P> {
    pub fn new(
        accounts: Arc<dyn AccountRepositoryTrait>,
        matches: Arc<dyn MatchRepositoryTrait>,
        gateway: Arc<dyn GameApiGateway>,
        progress_reporter: Arc<P>,
        config: SyncConfig,
    ) -> Self {
        let login_cooldown = CooldownTracker::new(config.login_cooldown);
        Self {
            accounts,
            matches,
            gateway,
            progress_reporter,
            config,
            sweep_lock: SingleFlight::new(),
            login_cooldown,
        }
    }

    /// Replace the sweep lock, e.g. to share one lock between orchestrators.
    pub fn with_sweep_lock(mut self, lock: SingleFlight) -> Self {
        self.sweep_lock = lock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_sweep_running(&self) -> bool {
        self.sweep_lock.is_running()
    }

    /// Incremental sync of one account: fetch matches newer than the last
    /// successful sync until a known match, a short page or the offset cap.
    ///
    /// Returns the number of newly stored matches. Does not touch the
    /// account's sync status; see [`run_sync`](Self::run_sync).
    pub async fn sync_account(
        &self,
        account_key: &str,
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        let account = self.load_account(account_key)?;
        self.incremental_pass(&account, cancel).await
    }

    /// Walk older history until the account has the target number of stored
    /// matches. Returns the number of matches added.
    pub async fn backfill_account(
        &self,
        account_key: &str,
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        let account = self.load_account(account_key)?;
        self.backfill_pass(&account, cancel).await
    }

    /// Full account sync with status bookkeeping and progress events:
    /// incremental pass, then the backfill extension.
    ///
    /// The account is claimed atomically first; if another sync holds it the
    /// call returns [`SyncError::AlreadyRunning`] and changes nothing.
    /// On success the account is `completed` and its last sync time is the
    /// time the run started. On failure it is `failed` and an error event is
    /// reported. On cancellation it goes back to `idle` without events.
    pub async fn run_sync(
        &self,
        account_key: &str,
        cancel: &CancellationToken,
    ) -> Result<AccountSyncSummary, SyncError> {
        let account = self.load_account(account_key)?;
        let started_at = Utc::now();

        if !self.accounts.try_begin_sync(account_key).await? {
            debug!("Sync of {} already running", account.riot_id());
            return Err(SyncError::AlreadyRunning(account_key.to_string()));
        }
        self.progress_reporter.report_progress(
            account_key,
            SyncProgressEvent::Progress {
                current: 0,
                total: 0,
                current_item_id: None,
            },
        );
        info!("Syncing account {}", account.riot_id());

        let outcome = match self.sync_passes(&account, cancel).await {
            Ok(summary) => self
                .accounts
                .record_successful_sync(account_key, started_at)
                .await
                .map(|_| summary)
                .map_err(SyncError::from),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(summary) => {
                self.settle_status(account_key, SyncStatus::Completed).await;
                self.progress_reporter.report_progress(
                    account_key,
                    SyncProgressEvent::Complete {
                        total_synced: summary.total_synced(),
                    },
                );
                info!(
                    "Synced account {}: {} new, {} backfilled, {} stored",
                    account.riot_id(),
                    summary.new_matches,
                    summary.backfilled_matches,
                    summary.stored_total
                );
                Ok(summary)
            }
            Err(SyncError::Cancelled) => {
                info!("Sync of account {} cancelled", account.riot_id());
                self.settle_status(account_key, SyncStatus::Idle).await;
                Err(SyncError::Cancelled)
            }
            Err(e) => {
                error!("Failed to sync account {}: {}", account.riot_id(), e);
                self.settle_status(account_key, SyncStatus::Failed).await;
                self.progress_reporter.report_progress(
                    account_key,
                    SyncProgressEvent::Error {
                        message: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    /// Sync every tracked account, one after another.
    ///
    /// Returns `None` without doing anything when another sweep holds the lock.
    /// A failing account is logged and counted; the sweep moves on. Accounts
    /// are re-read right before their turn, and one that is queued or
    /// syncing by then is skipped.
    pub async fn run_global_sweep(&self, cancel: &CancellationToken) -> Option<SweepSummary> {
        let Some(_guard) = self.sweep_lock.try_acquire() else {
            info!("Global sync sweep already running, skipping");
            return None;
        };

        let mut summary = SweepSummary::default();
        let accounts = match self.accounts.list_accounts() {
            Ok(accounts) => accounts,
            Err(e) => {
                error!("Global sync sweep could not list accounts: {}", e);
                return Some(summary);
            }
        };
        info!("Global sync sweep started for {} accounts", accounts.len());

        for listed in accounts {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            let account = match self.accounts.get_account(&listed.key) {
                Ok(Some(account)) => account,
                Ok(None) => {
                    debug!("Skipping account {}: no longer tracked", listed.riot_id());
                    summary.accounts_skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!("Could not reload account {}: {}", listed.riot_id(), e);
                    summary.accounts_failed += 1;
                    continue;
                }
            };
            if account.sync_status.is_in_flight() {
                debug!(
                    "Skipping account {}: status {}",
                    account.riot_id(),
                    account.sync_status
                );
                summary.accounts_skipped += 1;
                continue;
            }

            match self.run_sync(&account.key, cancel).await {
                Ok(result) => {
                    summary.accounts_synced += 1;
                    summary.matches_ingested += result.total_synced();
                }
                Err(SyncError::AlreadyRunning(_)) => summary.accounts_skipped += 1,
                Err(SyncError::Cancelled) => {
                    summary.cancelled = true;
                    break;
                }
                Err(_) => summary.accounts_failed += 1,
            }
        }

        info!(
            "Global sync sweep finished: {} synced, {} failed, {} skipped, {} matches",
            summary.accounts_synced,
            summary.accounts_failed,
            summary.accounts_skipped,
            summary.matches_ingested
        );
        Some(summary)
    }

    /// Sync an account when its owner logs in, at most once per cooldown
    /// window and never while a sync is queued or running.
    pub async fn check_on_login(
        &self,
        account_key: &str,
        cancel: &CancellationToken,
    ) -> Result<LoginCheckOutcome, SyncError> {
        let account = self.load_account(account_key)?;
        if account.sync_status.is_in_flight() {
            debug!(
                "Login check skipped for {}: status {}",
                account.riot_id(),
                account.sync_status
            );
            return Ok(LoginCheckOutcome::SkippedInFlight);
        }
        if !self.login_cooldown.try_begin(account_key) {
            debug!("Login check skipped for {}: cooling down", account.riot_id());
            return Ok(LoginCheckOutcome::SkippedCooldown);
        }

        match self.run_sync(account_key, cancel).await {
            Ok(summary) => Ok(LoginCheckOutcome::Synced(summary)),
            Err(SyncError::AlreadyRunning(_)) => Ok(LoginCheckOutcome::SkippedInFlight),
            Err(e) => Err(e),
        }
    }

    fn load_account(&self, account_key: &str) -> Result<Account, SyncError> {
        self.accounts
            .get_account(account_key)?
            .ok_or_else(|| SyncError::AccountNotFound(account_key.to_string()))
    }

    async fn settle_status(&self, account_key: &str, status: SyncStatus) {
        if let Err(e) = self.accounts.update_sync_status(account_key, status).await {
            error!(
                "Failed to set sync status of {} to {}: {}",
                account_key, status, e
            );
        }
    }

    async fn sync_passes(
        &self,
        account: &Account,
        cancel: &CancellationToken,
    ) -> Result<AccountSyncSummary, SyncError> {
        let new_matches = self.incremental_pass(account, cancel).await?;
        let backfilled_matches = self.backfill_pass(account, cancel).await?;
        let stored_total = self.matches.stored_match_count(&account.key)?;
        Ok(AccountSyncSummary {
            account_key: account.key.clone(),
            new_matches,
            backfilled_matches,
            stored_total,
        })
    }

    async fn incremental_pass(
        &self,
        account: &Account,
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        let known = self.matches.known_match_ids(&account.key)?;
        let mut cursor = SyncCursor::incremental(
            account.last_synced_at,
            known,
            self.config.lookback,
            Utc::now(),
        );
        let mut discovered = 0;
        let mut processed = 0;
        let mut ingested = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            if cursor.offset() >= self.config.max_incremental_offset {
                warn!(
                    "Incremental sync of {} reached offset cap {}",
                    account.riot_id(),
                    self.config.max_incremental_offset
                );
                break;
            }

            let page = self
                .gateway
                .list_recent_match_ids(
                    &account.key,
                    cursor.offset(),
                    self.config.page_size,
                    cursor.since(),
                    cancel,
                )
                .await?;
            discovered += page.len();
            debug!(
                "Fetched {} match ids for {} at offset {}",
                page.len(),
                account.riot_id(),
                cursor.offset()
            );

            let mut reached_known = false;
            for match_id in &page {
                if cursor.is_known(match_id) {
                    debug!("Reached known match {}, stopping", match_id);
                    reached_known = true;
                    break;
                }
                if self.ingest_match(&account.key, match_id, cancel).await? {
                    cursor.mark_known(match_id);
                    ingested += 1;
                }
                processed += 1;
                self.progress_reporter.report_progress(
                    &account.key,
                    SyncProgressEvent::Progress {
                        current: processed,
                        total: discovered,
                        current_item_id: Some(match_id.clone()),
                    },
                );
            }

            if reached_known {
                break;
            }
            cursor.advance(page.len());
            if page.len() < self.config.page_size {
                break;
            }
        }

        Ok(ingested)
    }

    async fn backfill_pass(
        &self,
        account: &Account,
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        let target = self.config.backfill_target;
        let mut stored = self.matches.stored_match_count(&account.key)?;
        if stored >= target {
            return Ok(0);
        }

        let mut cursor = SyncCursor::backfill(self.matches.known_match_ids(&account.key)?);
        let mut ingested = 0;

        while stored < target {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            if cursor.offset() >= self.config.max_backfill_offset {
                warn!(
                    "Backfill of {} reached offset cap {} with {} stored",
                    account.riot_id(),
                    self.config.max_backfill_offset,
                    stored
                );
                break;
            }

            let page = self
                .gateway
                .list_recent_match_ids(
                    &account.key,
                    cursor.offset(),
                    self.config.page_size,
                    None,
                    cancel,
                )
                .await?;

            for match_id in &page {
                if stored >= target {
                    break;
                }
                if cursor.is_known(match_id) {
                    continue;
                }
                if self.ingest_match(&account.key, match_id, cancel).await? {
                    cursor.mark_known(match_id);
                    stored += 1;
                    ingested += 1;
                    self.progress_reporter.report_progress(
                        &account.key,
                        SyncProgressEvent::Progress {
                            current: stored,
                            total: target,
                            current_item_id: Some(match_id.clone()),
                        },
                    );
                }
            }

            cursor.advance(page.len());
            if page.len() < self.config.page_size {
                break;
            }
        }

        if ingested > 0 {
            info!(
                "Backfilled {} older matches for {} ({} stored)",
                ingested,
                account.riot_id(),
                stored
            );
        }
        Ok(ingested)
    }

    /// Fetch and store one match. Returns false when the match was skipped
    /// because its detail could not be fetched or stored.
    async fn ingest_match(
        &self,
        account_key: &str,
        match_id: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, SyncError> {
        let detail = match self.gateway.get_match_detail(match_id, cancel).await {
            Ok(detail) => detail,
            Err(e) if e.is_cancelled() => return Err(SyncError::Cancelled),
            Err(e) => {
                warn!("Skipping match {}: {}", match_id, e);
                return Ok(false);
            }
        };

        if !detail.has_participant(account_key) {
            warn!(
                "Match {} does not list account {} as a participant",
                match_id, account_key
            );
        }

        match self
            .matches
            .upsert_match(to_match_record(detail, account_key))
            .await
        {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Failed to store match {}: {}", match_id, e);
                Ok(false)
            }
        }
    }
}
