//! Route definitions for table administration and the approval workflow.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{grants, tables};
use crate::state::AppState;

/// Table routes, nested under `/tables`.
///
/// ```text
/// POST   /                            create_table
/// GET    /                            list_tables
/// POST   /reuse                       reuse_table
/// POST   /check-title                 check_title
/// PUT    /{table_id}                  edit_table
/// POST   /{table_id}/approve          approve_table
/// POST   /{table_id}/disapprove       disapprove_table
/// POST   /{table_id}/acknowledge      acknowledge_table
/// GET    /{table_id}/properties       table_properties
/// GET    /{table_id}/data             table_data
/// GET    /{table_id}/export           export_table
/// PUT    /{table_id}/write-access     set_write_access
/// POST   /{table_id}/read-access      set_read_access
/// GET    /{table_id}/readers          table_readers
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(tables::create_table).get(tables::list_tables))
        .route("/reuse", post(tables::reuse_table))
        .route("/check-title", post(tables::check_title))
        .route("/{table_id}", put(tables::edit_table))
        .route("/{table_id}/approve", post(tables::approve_table))
        .route("/{table_id}/disapprove", post(tables::disapprove_table))
        .route("/{table_id}/acknowledge", post(tables::acknowledge_table))
        .route("/{table_id}/properties", get(tables::table_properties))
        .route("/{table_id}/data", get(tables::table_data))
        .route("/{table_id}/export", get(tables::export_table))
        .route("/{table_id}/write-access", put(grants::set_write_access))
        .route("/{table_id}/read-access", post(grants::set_read_access))
        .route("/{table_id}/readers", get(grants::table_readers))
}
