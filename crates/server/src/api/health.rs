//! Liveness, link status, metrics and effective config.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use strider_relay::{LinkState, MetricsSnapshot, RelayStatus};

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub upstream: LinkState,
    pub subscribers: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        upstream: state.relay.status().state,
        subscribers: state.relay.subscriber_count(),
    })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<RelayStatus> {
    Json(state.relay.status())
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.relay.metrics())
}

pub async fn config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.config.redacted_summary())
}
