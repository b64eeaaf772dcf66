use std::time::Duration;

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Match ids requested per list call.
    pub page_size: usize,
    /// Incremental paging stops at this offset even without a known match.
    pub max_incremental_offset: usize,
    /// Stored matches an account should reach through backfill.
    pub backfill_target: usize,
    /// Backfill paging stops at this offset.
    pub max_backfill_offset: usize,
    /// How far back the first sync of an account looks.
    pub lookback: chrono::Duration,
    /// Minimum time between two login-triggered checks of one account.
    pub login_cooldown: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_incremental_offset: 1_000,
            backfill_target: 100,
            max_backfill_offset: 2_000,
            lookback: chrono::Duration::days(30),
            login_cooldown: Duration::from_secs(5 * 60),
        }
    }
}
