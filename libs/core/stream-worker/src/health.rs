//! Liveness endpoint.
//!
//! Reports only that the process is serving HTTP; consumer failures are
//! visible in logs, not here.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct HealthState {
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

pub async fn health_handler(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: state.service,
    })
}

/// `GET /health`
pub fn health_router(service: impl Into<String>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(HealthState {
            service: service.into(),
        })
}
