use std::time::Duration;

use log::{error, info, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::job::BackfillJob;
use super::result::{BackfillJobResult, JobStatus};
use crate::errors::JobError;

/// Batching parameters shared by every job a runner executes.
#[derive(Debug, Clone)]
pub struct BackfillConfig {
    /// Items handed to one `process_batch` call. Must be positive.
    pub batch_size: usize,
    /// Pause between two batches, to leave rate limit headroom for live sync.
    pub batch_delay: Duration,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            batch_delay: Duration::from_secs(2),
        }
    }
}

/// Drives a [`BackfillJob`] through its batches.
pub struct BackfillJobRunner {
    batch_size: usize,
    batch_delay: Duration,
}

impl BackfillJobRunner {
    pub fn new(config: BackfillConfig) -> Result<Self, JobError> {
        if config.batch_size == 0 {
            return Err(JobError::InvalidConfig(
                "batch size must be positive".to_string(),
            ));
        }
        Ok(Self {
            batch_size: config.batch_size,
            batch_delay: config.batch_delay,
        })
    }

    /// Run `job` to a terminal status.
    ///
    /// Never returns an error: failures and cancellation are reported in the
    /// result status.
    pub async fn run(&self, job: &dyn BackfillJob, cancel: &CancellationToken) -> BackfillJobResult {
        let started = Instant::now();
        let name = job.name().to_string();
        let mut result = BackfillJobResult::pending(&name);
        result.start();
        info!("Backfill job '{}' started", name);

        let total = match job.total_items(cancel).await {
            Ok(total) => total,
            Err(e) if e.is_cancelled() => return Self::cancelled(result, started),
            Err(e) => return Self::failed(job, result, e, started, cancel).await,
        };
        result.set_total(total);

        let mut start = 0;
        while start < total {
            if cancel.is_cancelled() {
                return Self::cancelled(result, started);
            }

            let size = self.batch_size.min(total - start);
            match job.process_batch(start, size, cancel).await {
                Ok(processed) => result.add_processed(processed),
                Err(e) if e.is_cancelled() => return Self::cancelled(result, started),
                Err(e) => return Self::failed(job, result, e, started, cancel).await,
            }
            start += self.batch_size;

            info!(
                "Backfill job '{}': {}/{} ({:.1}%)",
                name,
                result.items_processed(),
                total,
                result.items_processed() as f64 * 100.0 / total as f64
            );

            if start < total {
                tokio::select! {
                    _ = cancel.cancelled() => return Self::cancelled(result, started),
                    _ = tokio::time::sleep(self.batch_delay) => {}
                }
            }
        }

        if cancel.is_cancelled() {
            return Self::cancelled(result, started);
        }

        if let Err(e) = job.on_complete(cancel).await {
            return Self::failed(job, result, e, started, cancel).await;
        }

        let result = result.finish(JobStatus::Completed, started.elapsed());
        info!(
            "Backfill job '{}' completed: {} items in {:.1}s",
            name,
            result.items_processed(),
            result.duration_seconds()
        );
        result
    }

    fn cancelled(result: BackfillJobResult, started: Instant) -> BackfillJobResult {
        warn!(
            "Backfill job '{}' cancelled after {} items",
            result.job_name(),
            result.items_processed()
        );
        result.finish(JobStatus::Cancelled, started.elapsed())
    }

    async fn failed(
        job: &dyn BackfillJob,
        result: BackfillJobResult,
        err: JobError,
        started: Instant,
        cancel: &CancellationToken,
    ) -> BackfillJobResult {
        error!("Backfill job '{}' failed: {}", result.job_name(), err);
        if let Err(hook_err) = job.on_error(&err, cancel).await {
            error!(
                "Backfill job '{}' error hook failed: {}",
                result.job_name(),
                hook_err
            );
        }
        result.fail(err.to_string(), started.elapsed())
    }
}
