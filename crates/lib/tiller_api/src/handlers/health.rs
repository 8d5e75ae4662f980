//! Liveness probe.

use axum::{Json, extract::State};

use crate::AppState;
use crate::error::AppResult;
use crate::models::HealthResponse;

/// `GET /health`: reports the crate version and whether the database
/// answers a trivial query.
pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let db_connected = sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .is_ok();

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: tiller_core::version().to_string(),
        db_connected,
    }))
}
