use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use matchsync_game_api::RateLimitSnapshot;
use matchsync_ingest::backfill::BackfillJobResult;
use tracing::info;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

pub(crate) fn require_admin(state: &AppState, user: &AuthUser) -> ApiResult<()> {
    if state.is_admin(user.id()) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin access required".to_string()))
    }
}

async fn rate_limit_snapshot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<RateLimitSnapshot>> {
    require_admin(&state, &user)?;
    Ok(Json(state.limiter.snapshot()))
}

async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<String>>> {
    require_admin(&state, &user)?;
    Ok(Json(state.jobs.names()))
}

/// Run a registered job to completion and return its result. A failed job is
/// still a 200: the failure is reported in the result body.
async fn run_job(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
) -> ApiResult<Json<BackfillJobResult>> {
    require_admin(&state, &user)?;
    let job = state
        .jobs
        .create(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown backfill job '{}'", name)))?;

    info!("Backfill job {} started by {}", name, user.id());
    let cancel = state.shutdown.child_token();
    let result = state.backfill_runner.run(job.as_ref(), &cancel).await;
    Ok(Json(result))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/rate-limit", get(rate_limit_snapshot))
        .route("/admin/backfill", get(list_jobs))
        .route("/admin/backfill/{name}", post(run_job))
}
