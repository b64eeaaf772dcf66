use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{info, warn};
use matchsync_core::accounts::AccountRepositoryTrait;
use tokio_util::sync::CancellationToken;

use crate::backfill::BackfillJob;
use crate::errors::{JobError, SyncError};
use crate::sync::{SyncOrchestrator, SyncProgressReporter};

pub const ACCOUNT_HISTORY_JOB: &str = "account-history";

/// Runs the older-history backfill for every tracked account.
pub struct AccountHistoryJob<P: SyncProgressReporter> {
    accounts: Arc<dyn AccountRepositoryTrait>,
    orchestrator: Arc<SyncOrchestrator<P>>,
    snapshot: Mutex<Vec<String>>,
    backfilled: AtomicUsize,
}

impl<P: SyncProgressReporter> AccountHistoryJob<P> {
    pub fn new(
        accounts: Arc<dyn AccountRepositoryTrait>,
        orchestrator: Arc<SyncOrchestrator<P>>,
    ) -> Self {
        Self {
            accounts,
            orchestrator,
            snapshot: Mutex::new(Vec::new()),
            backfilled: AtomicUsize::new(0),
        }
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, Vec<String>> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<P: SyncProgressReporter + 'static> BackfillJob for AccountHistoryJob<P> {
    fn name(&self) -> &str {
        ACCOUNT_HISTORY_JOB
    }

    async fn total_items(&self, _cancel: &CancellationToken) -> Result<usize, JobError> {
        let keys: Vec<String> = self
            .accounts
            .list_accounts()?
            .into_iter()
            .map(|a| a.key)
            .collect();
        let total = keys.len();
        *self.lock_snapshot() = keys;
        Ok(total)
    }

    async fn process_batch(
        &self,
        start: usize,
        size: usize,
        cancel: &CancellationToken,
    ) -> Result<usize, JobError> {
        let batch: Vec<String> = self
            .lock_snapshot()
            .iter()
            .skip(start)
            .take(size)
            .cloned()
            .collect();

        let mut processed = 0;
        for key in &batch {
            match self.orchestrator.backfill_account(key, cancel).await {
                Ok(count) => {
                    self.backfilled.fetch_add(count, Ordering::Relaxed);
                }
                Err(SyncError::Cancelled) => return Err(JobError::Cancelled),
                Err(e) => warn!("History backfill failed for account {}: {}", key, e),
            }
            processed += 1;
        }
        Ok(processed)
    }

    async fn on_complete(&self, _cancel: &CancellationToken) -> Result<(), JobError> {
        let backfilled = self.backfilled.load(Ordering::Relaxed);
        info!(
            "History backfill added {} matches across {} accounts",
            backfilled,
            self.lock_snapshot().len()
        );
        Ok(())
    }
}
