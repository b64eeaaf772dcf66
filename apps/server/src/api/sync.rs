use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Extension, Router};
use tracing::{debug, info};

use crate::{
    api::admin::require_admin,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

/// Start a global sweep in the background.
async fn start_sweep(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    require_admin(&state, &user)?;
    if state.orchestrator.is_sweep_running() {
        return Err(ApiError::Conflict("A sweep is already running".to_string()));
    }

    let orchestrator = state.orchestrator.clone();
    let cancel = state.shutdown.child_token();
    tokio::spawn(async move {
        match orchestrator.run_global_sweep(&cancel).await {
            Some(summary) => info!(
                "Manual sweep finished: {} synced, {} failed, {} skipped",
                summary.accounts_synced, summary.accounts_failed, summary.accounts_skipped
            ),
            None => debug!("Manual sweep skipped: a sweep is already running"),
        }
    });
    Ok(StatusCode::ACCEPTED)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/sync/sweep", post(start_sweep))
}
