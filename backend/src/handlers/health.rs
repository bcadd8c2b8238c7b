//! Health check handler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::AppState;

/// Liveness plus a database round-trip.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok", "database": "up" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Health check database error: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "degraded", "database": "down" })),
            )
                .into_response()
        }
    }
}
