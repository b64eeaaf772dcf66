//! Concrete backfill jobs and the registry that builds them by name.

mod account_history;
mod match_refresh;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use account_history::{AccountHistoryJob, ACCOUNT_HISTORY_JOB};
pub use match_refresh::{MatchRefreshJob, MATCH_REFRESH_JOB};

use matchsync_core::accounts::AccountRepositoryTrait;
use matchsync_core::matches::MatchRepositoryTrait;
use matchsync_game_api::GameApiGateway;

use crate::backfill::BackfillJob;
use crate::sync::{SyncOrchestrator, SyncProgressReporter};

/// Builds a fresh job instance for one run.
pub type JobFactory = Arc<dyn Fn() -> Box<dyn BackfillJob> + Send + Sync>;

/// Named job factories.
#[derive(Clone, Default)]
pub struct JobRegistry {
    factories: BTreeMap<String, JobFactory>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; a later registration under the same name wins.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn BackfillJob> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// A new instance of the named job, if it is registered.
    pub fn create(&self, name: &str) -> Option<Box<dyn BackfillJob>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

/// Registry holding every built-in job.
pub fn builtin_registry<P: SyncProgressReporter + 'static>(
    accounts: Arc<dyn AccountRepositoryTrait>,
    matches: Arc<dyn MatchRepositoryTrait>,
    gateway: Arc<dyn GameApiGateway>,
    orchestrator: Arc<SyncOrchestrator<P>>,
) -> JobRegistry {
    let mut registry = JobRegistry::new();
    registry.register(MATCH_REFRESH_JOB, move || {
        Box::new(MatchRefreshJob::new(matches.clone(), gateway.clone())) as Box<dyn BackfillJob>
    });
    registry.register(ACCOUNT_HISTORY_JOB, move || {
        Box::new(AccountHistoryJob::new(accounts.clone(), orchestrator.clone())) as Box<dyn BackfillJob>
    });
    registry
}
