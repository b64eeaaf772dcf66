//! Background scheduler for the periodic global sweep.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::main_lib::AppState;

/// Run `task` after `initial_delay`, then every `interval`, until `cancel`.
///
/// The next run is scheduled from the start of the previous one; a run that
/// overshoots the interval is followed immediately by the next. The task
/// itself is awaited, so runs never overlap.
pub async fn run_periodic<F, Fut>(
    interval: Duration,
    initial_delay: Duration,
    cancel: CancellationToken,
    mut task: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut next = Instant::now() + initial_delay;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = sleep_until(next) => {}
        }
        next = Instant::now() + interval;
        task().await;
    }
}

/// Starts the background sweep scheduler.
pub fn start_sync_scheduler(
    state: Arc<AppState>,
    interval: Duration,
    initial_delay: Duration,
) -> JoinHandle<()> {
    let cancel = state.shutdown.child_token();
    tokio::spawn(async move {
        info!(
            "Sync scheduler started ({}s interval, first sweep in {}s)",
            interval.as_secs(),
            initial_delay.as_secs()
        );
        run_periodic(interval, initial_delay, cancel.clone(), || {
            run_scheduled_sweep(&state, &cancel)
        })
        .await;
        info!("Sync scheduler stopped");
    })
}

async fn run_scheduled_sweep(state: &AppState, cancel: &CancellationToken) {
    info!("Running scheduled sync sweep...");
    match state.orchestrator.run_global_sweep(cancel).await {
        Some(summary) => info!(
            "Scheduled sweep finished: {} synced, {} failed, {} skipped, {} matches",
            summary.accounts_synced,
            summary.accounts_failed,
            summary.accounts_skipped,
            summary.matches_ingested
        ),
        None => debug!("Scheduled sweep skipped: a sweep is already running"),
    }
}
