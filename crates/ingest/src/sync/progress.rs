//! Progress reporting for sync operations.
//!
//! The orchestrator emits events through [`SyncProgressReporter`] so that the
//! host decides where they go (the realtime hub, logs, nowhere).

/// One progress step of an account sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncProgressEvent {
    /// Work is underway. `total` is the best known total so far.
    Progress {
        current: usize,
        total: usize,
        current_item_id: Option<String>,
    },
    /// The account sync finished successfully.
    Complete { total_synced: usize },
    /// The account sync failed.
    Error { message: String },
}

impl SyncProgressEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SyncProgressEvent::Progress { .. })
    }
}

/// Trait for reporting sync progress.
///
/// Called inline from the sync loop, so implementations must not block.
pub trait SyncProgressReporter: Send + Sync {
    fn report_progress(&self, entity_key: &str, event: SyncProgressEvent);
}

/// A no-op progress reporter for contexts where progress reporting is not needed.
#[derive(Debug, Clone, Default)]
pub struct NoOpProgressReporter;

impl SyncProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _entity_key: &str, _event: SyncProgressEvent) {
        // No-op
    }
}
