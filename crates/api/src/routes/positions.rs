//! Route definitions for authority-tree administration.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::positions;
use crate::state::AppState;

/// Position routes, nested under `/positions`.
///
/// ```text
/// POST   /                          create_position
/// PUT    /{position_id}/parent      move_position
/// GET    /attention                 attention_positions
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(positions::create_position))
        .route("/{position_id}/parent", put(positions::move_position))
        .route("/attention", get(positions::attention_positions))
}
