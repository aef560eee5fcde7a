//! Route definitions for the unit-side submission flow.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::submissions;
use crate::state::AppState;

/// Unit routes, nested under `/units`.
///
/// ```text
/// GET    /tables                           list_unit_tables
/// POST   /tables/{table_id}/submissions    submit_table_data
/// GET    /tables/{table_id}/template       download_template
/// POST   /tables/{table_id}/review         review_submission
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tables", get(submissions::list_unit_tables))
        .route(
            "/tables/{table_id}/submissions",
            post(submissions::submit_table_data),
        )
        .route(
            "/tables/{table_id}/template",
            get(submissions::download_template),
        )
        .route(
            "/tables/{table_id}/review",
            post(submissions::review_submission),
        )
}
