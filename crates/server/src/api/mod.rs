//! HTTP endpoints next to the observer WebSocket.
//!
//! Shared error body and the relay error mapping live here.

mod control;
mod health;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use strider_relay::RelayError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a relay failure onto a status code and `{"error": ...}` body.
pub(crate) fn relay_error(err: RelayError) -> ApiError {
    let status = match &err {
        RelayError::NoUpstream => StatusCode::SERVICE_UNAVAILABLE,
        RelayError::InvalidCommand(_) => StatusCode::BAD_REQUEST,
        RelayError::UpstreamWrite(_) => StatusCode::BAD_GATEWAY,
        RelayError::Connect { .. } | RelayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

pub use control::control;
pub use health::{config, health, metrics, status};
