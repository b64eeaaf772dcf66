use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use matchsync_realtime::HubStats;

use crate::main_lib::AppState;

async fn hub_stats(State(state): State<Arc<AppState>>) -> Json<HubStats> {
    Json(state.hub.stats())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/realtime/stats", get(hub_stats))
}
