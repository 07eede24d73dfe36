use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use shiftlog_core::sync::{
    DeleteHistoryRequest, DeleteHistoryResponse, ListRequest, ListResponse, SyncAck,
    SyncPushRequest,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::store::RemoteStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    store: RemoteStore,
}

impl AppState {
    pub async fn open(config: Arc<AppConfig>) -> shiftlog_core::Result<Self> {
        let store = RemoteStore::open(&config.db_path).await?;
        Ok(Self { config, store })
    }

    #[cfg(test)]
    pub const fn with_store(config: Arc<AppConfig>, store: RemoteStore) -> Self {
        Self { config, store }
    }
}

pub fn app_router(state: AppState) -> Router {
    let shift_routes = Router::new()
        .route("/shifts/sync", post(sync_shifts))
        .route("/shifts/list", post(list_shifts))
        .route("/shifts/delete", post(delete_shifts));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", shift_routes)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn sync_shifts(
    State(state): State<AppState>,
    payload: Result<Json<SyncPushRequest>, JsonRejection>,
) -> Result<Json<SyncAck>, AppError> {
    let Json(request) = payload?;
    let report = state.store.push(&request.email, &request.shifts).await?;
    tracing::info!(
        endpoint = "sync",
        received = request.shifts.len(),
        inserted = report.inserted,
        updated = report.updated,
        discarded = report.discarded,
        "Reconciled pushed shifts"
    );
    Ok(Json(SyncAck::from_report(report)))
}

async fn list_shifts(
    State(state): State<AppState>,
    payload: Result<Json<ListRequest>, JsonRejection>,
) -> Result<Json<ListResponse>, AppError> {
    let Json(request) = payload?;
    let response = state.store.list(&request).await?;
    tracing::debug!(
        endpoint = "list",
        items = response.items.len(),
        total = response.meta.total_items,
        "Listed shifts"
    );
    Ok(Json(response))
}

async fn delete_shifts(
    State(state): State<AppState>,
    payload: Result<Json<DeleteHistoryRequest>, JsonRejection>,
) -> Result<Json<DeleteHistoryResponse>, AppError> {
    let Json(request) = payload?;
    let deleted = state.store.delete_all(&request.email).await?;
    tracing::info!(endpoint = "delete", deleted, "Deleted shift history");
    Ok(Json(DeleteHistoryResponse { deleted }))
}
