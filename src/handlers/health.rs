use crate::core::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub users: usize,
    pub activations: usize,
    pub sessions: usize,
    pub activation_days: u32,
}

/// Liveness plus store sizes, the same numbers startup logs after WAL replay
///
/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            timestamp: Utc::now().timestamp(),
            users: state.users.len(),
            activations: state.activations.len(),
            sessions: state.sessions.len(),
            activation_days: state.activation_days(),
        }),
    )
}
