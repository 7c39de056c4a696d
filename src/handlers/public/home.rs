// handlers/public/home.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::handlers::protected::utils::options_response;
use crate::routes::AppState;

pub async fn home(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": state.config.api.name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn options() -> impl IntoResponse {
    options_response("OPTIONS, GET")
}

/// Store round trip; 503 when it fails
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "database unavailable",
                    "status": "degraded",
                    "timestamp": now
                })),
            )
        }
    }
}
