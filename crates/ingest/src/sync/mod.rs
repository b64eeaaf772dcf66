//! Account synchronization against the game API.

mod config;
mod cursor;
mod guard;
mod orchestrator;
mod progress;


pub use config::SyncConfig;
pub use cursor::SyncCursor;
pub use guard::{CooldownTracker, SingleFlight, SingleFlightGuard};
pub use orchestrator::{AccountSyncSummary, LoginCheckOutcome, SweepSummary, SyncOrchestrator};
pub use progress::{NoOpProgressReporter, SyncProgressEvent, SyncProgressReporter};
