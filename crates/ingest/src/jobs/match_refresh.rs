use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, info, warn};
use matchsync_core::matches::{MatchRef, MatchRepositoryTrait};
use matchsync_game_api::GameApiGateway;
use tokio_util::sync::CancellationToken;

use crate::backfill::BackfillJob;
use crate::errors::JobError;
use crate::mapping::to_match_record;

pub const MATCH_REFRESH_JOB: &str = "match-refresh";

/// Re-fetches the detail of every stored match and stores it again.
///
/// Repairs records written from partial payloads or by older versions.
/// The set of matches is fixed when the run starts.
pub struct MatchRefreshJob {
    matches: Arc<dyn MatchRepositoryTrait>,
    gateway: Arc<dyn GameApiGateway>,
    snapshot: Mutex<Vec<MatchRef>>,
}

impl MatchRefreshJob {
    pub fn new(matches: Arc<dyn MatchRepositoryTrait>, gateway: Arc<dyn GameApiGateway>) -> Self {
        Self {
            matches,
            gateway,
            snapshot: Mutex::new(Vec::new()),
        }
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, Vec<MatchRef>> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn refresh(&self, match_ref: &MatchRef, cancel: &CancellationToken) -> Result<(), JobError> {
        let detail = self
            .gateway
            .get_match_detail(&match_ref.match_id, cancel)
            .await?;
        self.matches
            .upsert_match(to_match_record(detail, &match_ref.account_key))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BackfillJob for MatchRefreshJob {
    fn name(&self) -> &str {
        MATCH_REFRESH_JOB
    }

    async fn total_items(&self, _cancel: &CancellationToken) -> Result<usize, JobError> {
        let refs = self.matches.list_match_refs()?;
        let total = refs.len();
        *self.lock_snapshot() = refs;
        Ok(total)
    }

    async fn process_batch(
        &self,
        start: usize,
        size: usize,
        cancel: &CancellationToken,
    ) -> Result<usize, JobError> {
        let batch: Vec<MatchRef> = self
            .lock_snapshot()
            .iter()
            .skip(start)
            .take(size)
            .cloned()
            .collect();

        let mut processed = 0;
        for match_ref in &batch {
            match self.refresh(match_ref, cancel).await {
                Ok(()) => debug!("Refreshed match {}", match_ref.match_id),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => warn!(
                    "Failed to refresh match {} of {}: {}",
                    match_ref.match_id, match_ref.account_key, e
                ),
            }
            processed += 1;
        }
        Ok(processed)
    }

    async fn on_complete(&self, _cancel: &CancellationToken) -> Result<(), JobError> {
        info!("Match refresh covered {} matches", self.lock_snapshot().len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use matchsync_core::store::InMemoryStore;

    use crate::backfill::{BackfillConfig, BackfillJobRunner, JobStatus};
    use crate::test_support::{feed, sample_detail, FakeGateway};

    async fn seed_stale(store: &InMemoryStore, key: &str, ids: &[String]) {
        for id in ids {
            let mut record = to_match_record(sample_detail(id, key), key);
            record.game_mode = "STALE".to_string();
            store.upsert_match(record).await.unwrap();
        }
    }

    fn runner() -> BackfillJobRunner {
        BackfillJobRunner::new(BackfillConfig {
            batch_size: 4,
            batch_delay: Duration::ZERO,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_failed_item_does_not_fail_the_job() {
        let ids = feed("p1", 10);
        let store = Arc::new(InMemoryStore::new());
        seed_stale(&store, "p1", &ids).await;
        let gateway = Arc::new(
            FakeGateway::new()
                .with_feed("p1", ids.clone())
                .failing_detail("p1_5"),
        );

        let job = MatchRefreshJob::new(store.clone(), gateway);
        let result = runner().run(&job, &CancellationToken::new()).await;

        assert_eq!(result.status(), JobStatus::Completed);
        assert_eq!(result.total_items(), 10);
        assert_eq!(result.items_processed(), 10);
        for id in &ids {
            let mode = store.get_match("p1", id).unwrap().game_mode;
            let expected = if id == "p1_5" { "STALE" } else { "CLASSIC" };
            assert_eq!(mode, expected, "match {id}");
        }
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let ids = feed("p1", 7);
        let store = Arc::new(InMemoryStore::new());
        seed_stale(&store, "p1", &ids).await;
        let gateway = Arc::new(FakeGateway::new().with_feed("p1", ids.clone()));
        let cancel = CancellationToken::new();

        let first = runner()
            .run(&MatchRefreshJob::new(store.clone(), gateway.clone()), &cancel)
            .await;
        let after_first: Vec<_> = ids.iter().map(|id| store.get_match("p1", id)).collect();

        let second = runner()
            .run(&MatchRefreshJob::new(store.clone(), gateway), &cancel)
            .await;
        let after_second: Vec<_> = ids.iter().map(|id| store.get_match("p1", id)).collect();

        assert_eq!(first.items_processed(), 7);
        assert_eq!(second.items_processed(), 7);
        assert_eq!(after_first, after_second);
        assert_eq!(store.stored_match_count("p1").unwrap(), 7);
    }

    #[tokio::test]
    async fn test_empty_store_completes() {
        let store = Arc::new(InMemoryStore::new());
        let job = MatchRefreshJob::new(store, Arc::new(FakeGateway::new()));
        let result = runner().run(&job, &CancellationToken::new()).await;

        assert_eq!(result.status(), JobStatus::Completed);
        assert_eq!(result.total_items(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_job() {
        let ids = feed("p1", 10);
        let store = Arc::new(InMemoryStore::new());
        seed_stale(&store, "p1", &ids).await;
        let cancel = CancellationToken::new();
        let gateway = Arc::new(
            FakeGateway::new()
                .with_feed("p1", ids)
                .cancel_after_details(2, cancel.clone()),
        );

        let job = MatchRefreshJob::new(store, gateway);
        let result = runner().run(&job, &cancel).await;

        assert_eq!(result.status(), JobStatus::Cancelled);
        assert!(result.items_processed() < 10);
    }
}
