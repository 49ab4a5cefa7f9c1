//! Scanner status and control routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use std::collections::BTreeMap;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{
    LimitParams, ReconnectResponse, RecordResponse, RecordsResponse, StatusHistoryResponse,
};
use crate::api::server::AppState;
use crate::domain::DeviceStatus;
use crate::persistence::PersistenceStats;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status_snapshot))
        .route("/persistence", get(persistence_stats))
        .route("/{id}/reconnect", post(force_reconnect))
        .route("/{id}/history", get(status_history))
        .route("/{id}/records", get(recent_records))
}

async fn status_snapshot(State(state): State<AppState>) -> Json<BTreeMap<String, DeviceStatus>> {
    Json(state.orchestrator.current_status())
}

async fn persistence_stats(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, PersistenceStats>> {
    Json(state.orchestrator.persistence_stats())
}

async fn force_reconnect(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReconnectResponse>> {
    if !state.orchestrator.force_reconnect(&id) {
        return Err(ApiError::not_found(format!("Scanner '{}' not found", id)));
    }
    Ok(Json(ReconnectResponse {
        success: true,
        device_id: id,
    }))
}

fn ensure_known(state: &AppState, id: &str) -> ApiResult<()> {
    if state.orchestrator.is_known(id) {
        Ok(())
    } else {
        Err(ApiError::not_found(format!("Scanner '{}' not found", id)))
    }
}

async fn status_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<StatusHistoryResponse>> {
    ensure_known(&state, &id)?;
    let repository = state
        .status_repository
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Status history not available"))?;

    let events = repository
        .list_for_device(&id, params.effective())
        .await?
        .into_iter()
        .map(|row| row.into_event())
        .collect::<crate::Result<Vec<_>>>()?;

    Ok(Json(StatusHistoryResponse {
        device_id: id,
        events,
    }))
}

async fn recent_records(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<RecordsResponse>> {
    ensure_known(&state, &id)?;
    let repository = state
        .record_repository
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Record store not available"))?;

    let counts = repository.count_by_validity(&id).await?;
    let records = repository
        .list_recent(&id, params.effective())
        .await?
        .into_iter()
        .map(RecordResponse::from)
        .collect();

    Ok(Json(RecordsResponse {
        device_id: id,
        counts,
        records,
    }))
}
