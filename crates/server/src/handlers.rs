//! HTTP handlers for the status surface.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rsyncit_core::AppConfig;
use rsyncit_rrdp::RrdpState;
use serde::Serialize;

/// `GET /status`: the outcome of the most recent cycle.
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<RrdpState>> {
    state
        .sync_state
        .rrdp_state()
        .map(Json)
        .ok_or_else(|| ApiError::NotReady("no sync cycle has completed yet".to_string()))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// `GET /health`: healthy once the last cycle published successfully.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.sync_state.rrdp_state() {
        Some(current) if current.in_sync => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                failure: None,
            }),
        ),
        Some(current) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                failure: current.failure,
            }),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                failure: Some("no sync cycle has completed yet".to_string()),
            }),
        ),
    }
}

/// `GET /config`: the effective configuration.
pub async fn config(State(state): State<AppState>) -> Json<AppConfig> {
    Json(state.config.as_ref().clone())
}
