use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::error;

use crate::db::ping;
use crate::state::AppState;

/// GET /health
/// Liveness only: answers without touching the database or cache.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "portfolio-api"
    }))
}

/// GET /api/health
/// Readiness: 503 when the database does not answer.
pub async fn api_health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let cache = json!({
        "backend": state.cache.backend_name(),
        "healthy": state.cache.is_healthy().await,
    });

    match ping(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "cache": cache,
            })),
        ),
        Err(e) => {
            error!("Health check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "disconnected",
                    "cache": cache,
                    "error": "database unreachable",
                })),
            )
        }
    }
}
