use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::JobError;

/// A unit of maintenance work processed in index-addressed batches.
///
/// The runner calls [`total_items`](Self::total_items) once, then
/// [`process_batch`](Self::process_batch) with increasing `start` offsets until
/// every index is covered, and finally exactly one of
/// [`on_complete`](Self::on_complete) or [`on_error`](Self::on_error). Neither
/// is called when the run is cancelled.
///
/// Implementations must isolate per-item failures: an item that cannot be
/// processed is logged and skipped, and only failures that make the rest of
/// the batch meaningless are returned as errors. Re-running a job over
/// unchanged data must leave storage in the same state.
///
/// A job instance serves a single run; the registry builds a fresh one for
/// every run.
#[async_trait]
pub trait BackfillJob: Send + Sync {
    fn name(&self) -> &str;

    /// Number of items this run covers. Called once, before any batch.
    async fn total_items(&self, cancel: &CancellationToken) -> Result<usize, JobError>;

    /// Process items `start..start + size` (clamped to the total) and return how
    /// many were attempted.
    async fn process_batch(
        &self,
        start: usize,
        size: usize,
        cancel: &CancellationToken,
    ) -> Result<usize, JobError>;

    async fn on_complete(&self, _cancel: &CancellationToken) -> Result<(), JobError> {
        Ok(())
    }

    async fn on_error(&self, _error: &JobError, _cancel: &CancellationToken) -> Result<(), JobError> {
        Ok(())
    }
}
