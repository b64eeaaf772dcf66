use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use matchsync_core::accounts::{Account, NewAccount, SyncStatus};
use matchsync_ingest::SyncError;
use matchsync_ingest::sync::{AccountSyncSummary, LoginCheckOutcome};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAccountRequest {
    pub game_name: String,
    pub tag_line: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub key: String,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub stored_matches: usize,
}

/// Load an account and check that `user` owns it.
pub(crate) fn owned_account(state: &AppState, user: &AuthUser, key: &str) -> ApiResult<Account> {
    let account = state
        .accounts
        .get_account(key)?
        .ok_or_else(|| ApiError::NotFound(format!("Account {} not found", key)))?;
    if account.owner_user_id != user.id() {
        return Err(ApiError::Forbidden(format!(
            "Account {} belongs to another user",
            key
        )));
    }
    Ok(account)
}

/// Run a full sync of `key` in the background.
fn spawn_sync(state: &Arc<AppState>, key: String) {
    let orchestrator = state.orchestrator.clone();
    let cancel = state.shutdown.child_token();
    tokio::spawn(async move {
        match orchestrator.run_sync(&key, &cancel).await {
            Ok(summary) => info!(
                "Background sync of {} stored {} matches",
                key,
                summary.total_synced()
            ),
            Err(e) if e.is_cancelled() => debug!("Background sync of {} cancelled", key),
            Err(SyncError::AlreadyRunning(_)) => {
                debug!("Background sync of {} skipped: already running", key)
            }
            Err(e) => warn!("Background sync of {} failed: {}", key, e),
        }
    });
}

async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(state.accounts.list_accounts_for_user(user.id())?))
}

async fn register_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<RegisterAccountRequest>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let game_name = payload.game_name.trim();
    let tag_line = payload.tag_line.trim().trim_start_matches('#');
    if game_name.is_empty() || tag_line.is_empty() {
        return Err(ApiError::BadRequest(
            "gameName and tagLine are required".to_string(),
        ));
    }

    let cancel = state.shutdown.child_token();
    let riot = state
        .gateway
        .lookup_account(game_name, tag_line, &cancel)
        .await?;

    let existing = state.accounts.get_account(&riot.puuid)?;
    if let Some(existing) = &existing {
        if existing.owner_user_id != user.id() {
            return Err(ApiError::Conflict(format!(
                "{} is already tracked by another user",
                existing.riot_id()
            )));
        }
    }

    let account = state
        .accounts
        .upsert_account(NewAccount {
            key: riot.puuid,
            owner_user_id: user.id().to_string(),
            game_name: if riot.game_name.is_empty() {
                game_name.to_string()
            } else {
                riot.game_name
            },
            tag_line: if riot.tag_line.is_empty() {
                tag_line.to_string()
            } else {
                riot.tag_line
            },
        })
        .await?;

    let status = if existing.is_none() {
        info!("Registered account {} for {}", account.riot_id(), user.id());
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    if existing.is_none() || !account.sync_status.is_in_flight() {
        spawn_sync(&state, account.key.clone());
    }
    Ok((status, Json(account)))
}

async fn get_sync_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(key): Path<String>,
) -> ApiResult<Json<SyncStatusResponse>> {
    let account = owned_account(&state, &user, &key)?;
    let stored_matches = state.matches.stored_match_count(&account.key)?;
    Ok(Json(SyncStatusResponse {
        key: account.key,
        sync_status: account.sync_status,
        last_synced_at: account.last_synced_at,
        stored_matches,
    }))
}

async fn sync_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(key): Path<String>,
) -> ApiResult<Json<AccountSyncSummary>> {
    let account = owned_account(&state, &user, &key)?;
    if account.sync_status == SyncStatus::Syncing {
        return Err(ApiError::Conflict(format!(
            "A sync of {} is already running",
            account.riot_id()
        )));
    }
    let cancel = state.shutdown.child_token();
    let summary = state.orchestrator.run_sync(&account.key, &cancel).await?;
    Ok(Json(summary))
}

async fn login_check(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    let account = owned_account(&state, &user, &key)?;
    let orchestrator = state.orchestrator.clone();
    let cancel = state.shutdown.child_token();
    tokio::spawn(async move {
        match orchestrator.check_on_login(&account.key, &cancel).await {
            Ok(LoginCheckOutcome::Synced(summary)) => info!(
                "Login sync of {} stored {} matches",
                account.key,
                summary.total_synced()
            ),
            Ok(LoginCheckOutcome::SkippedCooldown) => {
                debug!("Login sync of {} skipped: cooldown", account.key)
            }
            Ok(LoginCheckOutcome::SkippedInFlight) => {
                debug!("Login sync of {} skipped: already in flight", account.key)
            }
            Err(e) if e.is_cancelled() => debug!("Login sync of {} cancelled", account.key),
            Err(e) => warn!("Login sync of {} failed: {}", account.key, e),
        }
    });
    Ok(StatusCode::ACCEPTED)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/accounts", get(list_accounts).post(register_account))
        .route("/accounts/{key}/sync-status", get(get_sync_status))
        .route("/accounts/{key}/sync", post(sync_account))
        .route("/accounts/{key}/login-check", post(login_check))
}
