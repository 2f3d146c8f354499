//! /status and /peers handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use airbridge_services::{Rejection, StatsSnapshot};

use super::{ApiState, ConfigSummary};

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    pub config: ConfigSummary,
    pub counters: StatsSnapshot,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        uptime_secs: state.stats.uptime_secs(),
        config: state.summary.clone(),
        counters: state.stats.snapshot(),
    })
}

// ── /peers ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PeersResponse {
    pub peers: Vec<PeerInfo>,
}

#[derive(Serialize)]
pub struct PeerInfo {
    pub address: String,
    pub accepted: u64,
    pub rejected: u64,
    pub last_reason: Option<Rejection>,
    pub last_seen_secs: u64,
}

pub async fn handle_peers(State(state): State<ApiState>) -> Json<PeersResponse> {
    let peers = state
        .stats
        .sources()
        .into_iter()
        .map(|(address, s)| PeerInfo {
            address: address.to_string(),
            accepted: s.accepted,
            rejected: s.rejected,
            last_reason: s.last_reason,
            last_seen_secs: s.last_seen.elapsed().as_secs(),
        })
        .collect();

    Json(PeersResponse { peers })
}
