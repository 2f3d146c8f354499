//! /stats/reset handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use airbridge_services::StatsSnapshot;

use super::ApiState;

#[derive(Serialize)]
pub struct ResetResponse {
    /// Counters as they stood just before the reset.
    pub previous: StatsSnapshot,
}

pub async fn handle_stats_reset(State(state): State<ApiState>) -> Json<ResetResponse> {
    let previous = state.stats.snapshot();
    state.stats.reset();
    tracing::info!("relay stats reset via API");
    Json(ResetResponse { previous })
}
