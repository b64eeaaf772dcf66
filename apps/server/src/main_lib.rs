use std::collections::HashSet;
use std::sync::Arc;

use matchsync_core::{
    accounts::AccountRepositoryTrait, authz::OwnershipCheck, matches::MatchRepositoryTrait,
    store::InMemoryStore,
};
use matchsync_game_api::{GameApiGateway, RateLimiter, RiotApiClient};
use matchsync_ingest::{
    backfill::{BackfillConfig, BackfillJobRunner},
    jobs::{builtin_registry, JobRegistry},
    sync::{SyncConfig, SyncOrchestrator},
};
use matchsync_realtime::{HubConfig, ProgressBroadcastHub};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    auth::{decode_secret_key, AuthManager},
    config::{Config, LogFormat},
    progress::HubProgressReporter,
};

pub struct AppState {
    pub accounts: Arc<dyn AccountRepositoryTrait>,
    pub matches: Arc<dyn MatchRepositoryTrait>,
    pub authz: Arc<dyn OwnershipCheck>,
    pub limiter: Arc<RateLimiter>,
    pub gateway: Arc<dyn GameApiGateway>,
    pub orchestrator: Arc<SyncOrchestrator<HubProgressReporter>>,
    pub hub: Arc<ProgressBroadcastHub>,
    pub jobs: JobRegistry,
    pub backfill_runner: BackfillJobRunner,
    pub auth: Option<Arc<AuthManager>>,
    pub admin_users: HashSet<String>,
    /// Root token; cancelled on shutdown. Background work uses child tokens.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_users.contains(user_id)
    }
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

/// Build the application state with the HTTP game API client.
pub async fn build_state(
    config: &Config,
    shutdown: CancellationToken,
) -> anyhow::Result<Arc<AppState>> {
    let limiter = Arc::new(RateLimiter::new(config.rate_limit)?);
    let client = RiotApiClient::new(config.game_api.clone(), limiter.clone())?;
    if config.game_api.api_key.is_empty() {
        tracing::warn!("MS_GAME_API_KEY is not set; game API calls will be rejected upstream");
    }
    build_state_with_gateway(config, limiter, Arc::new(client), shutdown).await
}

/// Build the application state around any gateway. The gateway is expected
/// to gate its calls on `limiter`.
pub async fn build_state_with_gateway(
    config: &Config,
    limiter: Arc<RateLimiter>,
    gateway: Arc<dyn GameApiGateway>,
    shutdown: CancellationToken,
) -> anyhow::Result<Arc<AppState>> {
    let store = Arc::new(InMemoryStore::new());
    let accounts: Arc<dyn AccountRepositoryTrait> = store.clone();
    let matches: Arc<dyn MatchRepositoryTrait> = store.clone();
    let authz: Arc<dyn OwnershipCheck> = store;

    let hub = Arc::new(ProgressBroadcastHub::new(authz.clone(), HubConfig::default()));
    let reporter = HubProgressReporter::new(hub.clone());

    let orchestrator = Arc::new(SyncOrchestrator::new(
        accounts.clone(),
        matches.clone(),
        gateway.clone(),
        Arc::new(reporter),
        SyncConfig::default(),
    ));

    let jobs = builtin_registry(
        accounts.clone(),
        matches.clone(),
        gateway.clone(),
        orchestrator.clone(),
    );
    let backfill_runner = BackfillJobRunner::new(BackfillConfig::default())?;

    let auth = match config.jwt_secret.as_deref() {
        Some(raw) => {
            let secret = decode_secret_key(raw)?;
            Some(Arc::new(AuthManager::new(&secret)))
        }
        None => {
            tracing::warn!("MS_JWT_SECRET is not set; authentication is disabled");
            None
        }
    };

    Ok(Arc::new(AppState {
        accounts,
        matches,
        authz,
        limiter,
        gateway,
        orchestrator,
        hub,
        jobs,
        backfill_runner,
        auth,
        admin_users: config.admin_users.clone(),
        shutdown,
    }))
}
