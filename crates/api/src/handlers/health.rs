//! Health check handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /health
///
/// Returns `ok` once the database answers a ping.
pub async fn health(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    tabulate_db::health_check(&state.pool).await?;
    Ok(Json(json!({ "status": "ok" })))
}
