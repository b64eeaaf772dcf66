//! Dual-window rate limiter for the game API.
//!
//! The upstream API enforces two caps at once, a short burst window and a
//! longer rolling window (for example 20 requests per second and 100 requests
//! per two minutes). Each window is a sliding log of grant times: a window
//! has a permit while fewer than `capacity` grants fall inside the last
//! `period`, so no span of one period ever sees more than `capacity` grants.
//! A request may only proceed when both windows have a permit; it is then
//! recorded in both under a single lock, never in one window alone.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::GameApiError;

/// Default short window: 20 requests per second.
const DEFAULT_SHORT_CAPACITY: u32 = 20;
const DEFAULT_SHORT_PERIOD: Duration = Duration::from_secs(1);

/// Default long window: 100 requests per two minutes.
const DEFAULT_LONG_CAPACITY: u32 = 100;
const DEFAULT_LONG_PERIOD: Duration = Duration::from_secs(120);

/// Capacity and length of one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowConfig {
    pub capacity: u32,
    pub period: Duration,
}

impl WindowConfig {
    pub fn new(capacity: u32, period: Duration) -> Self {
        Self { capacity, period }
    }
}

/// Rate limiter configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Burst window.
    pub short: WindowConfig,
    /// Rolling quota window.
    pub long: WindowConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            short: WindowConfig::new(DEFAULT_SHORT_CAPACITY, DEFAULT_SHORT_PERIOD),
            long: WindowConfig::new(DEFAULT_LONG_CAPACITY, DEFAULT_LONG_PERIOD),
        }
    }
}

/// Grant times inside the trailing `period`, oldest first.
#[derive(Debug)]
struct Window {
    capacity: u32,
    period: Duration,
    grants: VecDeque<Instant>,
}

impl Window {
    fn new(config: WindowConfig) -> Self {
        Self {
            capacity: config.capacity,
            period: config.period,
            grants: VecDeque::with_capacity(config.capacity as usize),
        }
    }

    /// Forget grants that have slid out of the window.
    fn refresh(&mut self, now: Instant) {
        while let Some(&oldest) = self.grants.front() {
            if now.saturating_duration_since(oldest) >= self.period {
                self.grants.pop_front();
            } else {
                break;
            }
        }
    }

    fn available(&self) -> u32 {
        self.capacity.saturating_sub(self.grants.len() as u32)
    }

    fn has_permit(&self) -> bool {
        self.available() > 0
    }

    fn record(&mut self, now: Instant) {
        self.grants.push_back(now);
    }

    /// Time until the oldest grant leaves the window. Zero when a permit is free.
    fn wait_time(&self, now: Instant) -> Duration {
        match self.grants.front() {
            Some(&oldest) if !self.has_permit() => {
                (oldest + self.period).saturating_duration_since(now)
            }
            _ => Duration::ZERO,
        }
    }
}

#[derive(Debug)]
struct Windows {
    short: Window,
    long: Window,
}

impl Windows {
    /// Records one grant in both windows, or in neither.
    ///
    /// Returns the time to wait before trying again when either window is empty.
    fn try_take(&mut self, now: Instant) -> Result<(), Duration> {
        self.short.refresh(now);
        self.long.refresh(now);

        if self.short.has_permit() && self.long.has_permit() {
            self.short.record(now);
            self.long.record(now);
            return Ok(());
        }

        Err(self.short.wait_time(now).max(self.long.wait_time(now)))
    }
}

/// Point-in-time view of both windows.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSnapshot {
    pub short_available: u32,
    pub short_capacity: u32,
    pub long_available: u32,
    pub long_capacity: u32,
}

/// Rate limiter shared by every outbound game API call.
///
/// Thread-safe; clone an `Arc<RateLimiter>` into each client that needs it.
pub struct RateLimiter {
    windows: Mutex<Windows>,
}

impl RateLimiter {
    /// Create a rate limiter. Both windows need a non-zero capacity and period,
    /// otherwise the limiter could never grant a permit.
    pub fn new(config: RateLimitConfig) -> Result<Self, GameApiError> {
        for (label, window) in [("short", config.short), ("long", config.long)] {
            if window.capacity == 0 || window.period.is_zero() {
                return Err(GameApiError::InvalidConfig(format!(
                    "{} rate limit window needs a positive capacity and period",
                    label
                )));
            }
        }

        Ok(Self {
            windows: Mutex::new(Windows {
                short: Window::new(config.short),
                long: Window::new(config.long),
            }),
        })
    }

    /// Lock the windows, recovering from poison if necessary.
    fn lock_windows(&self) -> MutexGuard<'_, Windows> {
        self.windows.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Wait until both windows grant a permit.
    ///
    /// Fails only with [`GameApiError::Cancelled`] when `cancel` fires first;
    /// otherwise it always returns once the blocking window frees a permit.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), GameApiError> {
        loop {
            if cancel.is_cancelled() {
                return Err(GameApiError::Cancelled);
            }

            let wait_time = match self.lock_windows().try_take(Instant::now()) {
                Ok(()) => {
                    debug!("Rate limiter: permit acquired");
                    return Ok(());
                }
                Err(wait) => wait,
            };

            debug!("Rate limiter: waiting {:?} for a permit", wait_time);
            tokio::select! {
                _ = cancel.cancelled() => return Err(GameApiError::Cancelled),
                _ = tokio::time::sleep(wait_time) => {}
            }
        }
    }

    /// Take a permit without waiting.
    ///
    /// Returns true if a permit was acquired, false if either window is empty.
    pub fn try_acquire(&self) -> bool {
        self.lock_windows().try_take(Instant::now()).is_ok()
    }

    /// Current permits in both windows.
    pub fn snapshot(&self) -> RateLimitSnapshot {
        let now = Instant::now();
        let mut windows = self.lock_windows();
        windows.short.refresh(now);
        windows.long.refresh(now);
        RateLimitSnapshot {
            short_available: windows.short.available(),
            short_capacity: windows.short.capacity,
            long_available: windows.long.available(),
            long_capacity: windows.long.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(short: (u32, u64), long: (u32, u64)) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            short: WindowConfig::new(short.0, Duration::from_millis(short.1)),
            long: WindowConfig::new(long.0, Duration::from_millis(long.1)),
        })
        .unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = RateLimiter::new(RateLimitConfig {
            short: WindowConfig::new(0, Duration::from_secs(1)),
            long: WindowConfig::new(10, Duration::from_secs(10)),
        });
        assert!(matches!(result, Err(GameApiError::InvalidConfig(_))));

        let result = RateLimiter::new(RateLimitConfig {
            short: WindowConfig::new(1, Duration::from_secs(1)),
            long: WindowConfig::new(10, Duration::ZERO),
        });
        assert!(matches!(result, Err(GameApiError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_window_caps_burst() {
        let limiter = limiter((3, 1_000), (100, 60_000));

        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_millis(1_001)).await;
        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_partial_acquisition() {
        // Long window is the tighter one: once it is empty the short window
        // must keep its permits.
        let limiter = limiter((5, 1_000), (2, 60_000));

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.long_available, 0);
        assert_eq!(snapshot.short_available, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquires_respect_long_window() {
        let limiter = Arc::new(limiter((10, 1_000), (4, 10_000)));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let limiter = limiter.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire(&cancel).await.unwrap();
                Instant::now().duration_since(start)
            }));
        }

        let mut elapsed = Vec::new();
        for handle in handles {
            elapsed.push(handle.await.unwrap());
        }
        elapsed.sort();

        // Four complete at once, the rest only once the first grants slide out.
        assert!(elapsed[..4].iter().all(|d| *d < Duration::from_secs(10)));
        assert!(elapsed[4..].iter().all(|d| *d >= Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_limiter_never_doubles_its_burst() {
        let limiter = limiter((10, 1_000), (4, 10_000));

        // Sit idle almost a full long period, then burst on both sides of
        // where a window started at construction would have reset.
        tokio::time::advance(Duration::from_millis(9_990)).await;
        let first = (0..4).filter(|_| limiter.try_acquire()).count();
        tokio::time::advance(Duration::from_millis(20)).await;
        let second = (0..4).filter(|_| limiter.try_acquire()).count();

        assert_eq!(first, 4);
        assert_eq!(second, 0);
        assert_eq!(limiter.snapshot().long_available, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permits_return_one_period_after_each_grant() {
        let limiter = limiter((10, 1_000), (3, 10_000));

        assert!(limiter.try_acquire());
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        // Only the first grant has aged out.
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(limiter.snapshot().long_available, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_reset() {
        let limiter = limiter((1, 500), (100, 60_000));
        let cancel = CancellationToken::new();

        limiter.acquire(&cancel).await.unwrap();
        let start = Instant::now();
        limiter.acquire(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_cancelled_while_waiting() {
        let limiter = Arc::new(limiter((1, 60_000), (100, 60_000)));
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { limiter.acquire(&cancel).await })
        };

        tokio::time::advance(Duration::from_millis(10)).await;
        cancel.cancel();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(GameApiError::Cancelled)));
        // The cancelled waiter must not have consumed a permit.
        assert_eq!(limiter.snapshot().long_available, 99);
    }

    #[test]
    fn test_snapshot_defaults() {
        let limiter = RateLimiter::new(RateLimitConfig::default()).unwrap();
        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.short_capacity, DEFAULT_SHORT_CAPACITY);
        assert_eq!(snapshot.long_capacity, DEFAULT_LONG_CAPACITY);
        assert_eq!(snapshot.short_available, DEFAULT_SHORT_CAPACITY);
    }
}
