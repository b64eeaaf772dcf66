//! Run guards: single-flight for the sweep, cooldown for login checks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;

/// Non-blocking mutual exclusion for a recurring operation.
///
/// Clones share the same flag, so one lock can be handed to several owners.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    running: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a guard if nobody holds the lock, `None` otherwise. Never waits.
    pub fn try_acquire(&self) -> Option<SingleFlightGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SingleFlightGuard {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Releases the [`SingleFlight`] lock on drop.
#[derive(Debug)]
pub struct SingleFlightGuard {
    running: Arc<AtomicBool>,
}

impl Drop for SingleFlightGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Remembers when each key was last let through.
#[derive(Debug)]
pub struct CooldownTracker {
    window: Duration,
    last_seen: DashMap<String, Instant>,
}

impl CooldownTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: DashMap::new(),
        }
    }

    /// Let `key` through and start its cooldown, unless it is still cooling
    /// down. Check and record happen under one map entry lock.
    pub fn try_begin(&self, key: &str) -> bool {
        let now = Instant::now();
        match self.last_seen.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < self.window {
                    false
                } else {
                    entry.insert(now);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }
}
