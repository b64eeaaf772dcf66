//! Error types for sync and backfill.

use matchsync_game_api::GameApiError;
use thiserror::Error;

/// Failure of one account sync.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] matchsync_core::Error),

    #[error("Game API error: {0}")]
    Api(GameApiError),

    /// Another sync holds the account; nothing was done.
    #[error("Sync already running for account {0}")]
    AlreadyRunning(String),

    /// Not a failure: the caller asked to stop.
    #[error("Sync cancelled")]
    Cancelled,
}

impl SyncError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}

impl From<GameApiError> for SyncError {
    fn from(err: GameApiError) -> Self {
        if err.is_cancelled() {
            SyncError::Cancelled
        } else {
            SyncError::Api(err)
        }
    }
}

/// Failure of a backfill job or of its runner.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Invalid job configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(#[from] matchsync_core::Error),

    #[error("Game API error: {0}")]
    Api(GameApiError),

    #[error("Sync error: {0}")]
    Sync(SyncError),

    #[error("Job cancelled")]
    Cancelled,
}

impl JobError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Cancelled)
    }
}

impl From<GameApiError> for JobError {
    fn from(err: GameApiError) -> Self {
        if err.is_cancelled() {
            JobError::Cancelled
        } else {
            JobError::Api(err)
        }
    }
}

impl From<SyncError> for JobError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Cancelled => JobError::Cancelled,
            SyncError::Storage(e) => JobError::Storage(e),
            other => JobError::Sync(other),
        }
    }
}
