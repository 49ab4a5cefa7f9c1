//! Health check route.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;

use crate::api::models::HealthResponse;
use crate::api::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        scanners: state.orchestrator.device_ids().len(),
    })
}
