//! Route definitions, grouped by resource.

pub mod health;
pub mod positions;
pub mod tables;
pub mod units;

use axum::Router;

use crate::state::AppState;

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/tables", tables::router())
        .nest("/units", units::router())
        .nest("/positions", positions::router())
}
