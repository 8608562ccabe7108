//! JSON API — health, manual sync trigger, action queue, lead listing.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::error::{Error, SyncError};
use crate::store::Database;
use crate::sync::SyncEngine;
use crate::tasks;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub engine: Arc<SyncEngine>,
}

/// Build the Axum router for the service.
pub fn api_routes(db: Arc<dyn Database>, engine: Arc<SyncEngine>) -> Router {
    let state = AppState { db, engine };

    Router::new()
        .route("/health", get(health))
        .route("/api/connections/{id}/sync", post(trigger_sync))
        .route("/api/users/{user_id}/tasks", get(list_tasks))
        .route("/api/users/{user_id}/leads", get(list_leads))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "leadbox"
    }))
}

async fn trigger_sync(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    info!(connection_id = %id, "Manual sync requested");

    match state.engine.sync_connection(&id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({"threads_synced": outcome.threads_synced})),
        ),
        Err(e) => {
            warn!(connection_id = %id, "Manual sync failed: {e}");
            (sync_error_status(&e), Json(serde_json::json!({"error": e.to_string()})))
        }
    }
}

/// Map a sync failure onto an HTTP status: unknown connection → 404,
/// upstream provider trouble → 502, everything else → 500.
fn sync_error_status(err: &Error) -> StatusCode {
    match err {
        Error::Sync(SyncError::ConnectionNotFound(_)) => StatusCode::NOT_FOUND,
        Error::Sync(SyncError::Provider(_)) | Error::Provider(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn list_tasks(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match tasks::tasks_for_user(&state.db, &user_id).await {
        Ok(tasks) => (StatusCode::OK, Json(serde_json::json!(tasks))),
        Err(e) => {
            warn!(user_id = %user_id, "Task generation failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}

async fn list_leads(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.db.list_leads(&user_id).await {
        Ok(leads) => (StatusCode::OK, Json(serde_json::json!(leads))),
        Err(e) => {
            warn!(user_id = %user_id, "Lead listing failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}
