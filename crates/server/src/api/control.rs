//! Operator command intake.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use strider_relay::{Command, RelayError};

use super::{relay_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub command: String,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub status: &'static str,
}

/// `POST /api/control`: forward one command line to the scheduler.
///
/// Success means the line was written upstream, not that the scheduler
/// accepted it.
pub async fn control(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    let command = Command::new(req.command).map_err(|e| relay_error(RelayError::from(e)))?;
    state.relay.send_command(&command).await.map_err(relay_error)?;
    Ok(Json(ControlResponse { status: "sent" }))
}
