//! Handlers for read/write access-grant administration.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use tabulate_core::error::CoreError;
use tabulate_core::grant;
use tabulate_core::roles;
use tabulate_core::types::DbId;
use tabulate_core::workflow;
use tabulate_db::models::access_grant::{ReadAccessAction, SetReadAccess, SetWriteAccess};
use tabulate_db::repositories::{AccessGrantRepo, TableRepo, UnitRepo};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// PUT /api/v1/tables/{table_id}/write-access
///
/// Wholesale write-grant replacement. An empty unit list deletes every
/// write grant; a non-empty list additionally requires the table to be
/// finalized.
pub async fn set_write_access(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
    Json(input): Json<SetWriteAccess>,
) -> AppResult<impl IntoResponse> {
    auth.require_permission(roles::PERM_TABLE_PERMISSION)?;

    let series = TableRepo::find_series(&state.pool, table_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "TableSeries",
            id: table_id,
        })?;
    if !series.is_flow_member(auth.require_position()?) {
        return Err(CoreError::NoAccess.into());
    }

    if input.units.is_empty() {
        AccessGrantRepo::replace_write_grants(&state.pool, table_id, &[]).await?;
        tracing::info!(user_id = auth.user_id, table_id, "Write grants cleared");
        return Ok(StatusCode::NO_CONTENT);
    }

    let existing = UnitRepo::existing_ids(&state.pool, &input.units).await?;
    if existing.len() < input.units.len() {
        let missing = input
            .units
            .iter()
            .find(|id| !existing.contains(id))
            .copied()
            .unwrap_or_default();
        return Err(CoreError::NotFound {
            entity: "Unit",
            id: missing,
        }
        .into());
    }

    if !workflow::is_finalized(series.approval_level) {
        return Err(CoreError::NotFinalizedTable.into());
    }

    AccessGrantRepo::replace_write_grants(&state.pool, table_id, &input.units).await?;

    tracing::info!(
        user_id = auth.user_id,
        table_id,
        granted = input.units.len(),
        "Write grants replaced"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/tables/{table_id}/read-access
///
/// Add or remove one unit's read grant. Adding over an existing grant is
/// rejected with `NO_ACCESS`, not silently accepted.
pub async fn set_read_access(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
    Json(input): Json<SetReadAccess>,
) -> AppResult<impl IntoResponse> {
    auth.require_permission(roles::PERM_TABLE_PERMISSION)?;

    let series = TableRepo::find_series(&state.pool, table_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "TableSeries",
            id: table_id,
        })?;
    if !workflow::is_finalized(series.approval_level) {
        return Err(CoreError::NotFinalizedTable.into());
    }

    UnitRepo::find_by_id(&state.pool, input.unit_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Unit",
            id: input.unit_id,
        })?;

    match input.action {
        ReadAccessAction::Add => {
            let existing = AccessGrantRepo::find(
                &state.pool,
                table_id,
                input.unit_id,
                grant::PERMISSION_READ,
            )
            .await?;
            if existing.is_some() {
                return Err(CoreError::NoAccess.into());
            }
            AccessGrantRepo::insert_read(&state.pool, table_id, input.unit_id).await?;
            tracing::info!(
                user_id = auth.user_id,
                table_id,
                unit_id = input.unit_id,
                "Read grant added"
            );
        }
        ReadAccessAction::Remove => {
            AccessGrantRepo::delete_read(&state.pool, table_id, input.unit_id).await?;
            tracing::info!(
                user_id = auth.user_id,
                table_id,
                unit_id = input.unit_id,
                "Read grant removed"
            );
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/tables/{table_id}/readers
///
/// Units holding a read grant for the table.
pub async fn table_readers(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let readers =
        AccessGrantRepo::list_for_series(&state.pool, table_id, grant::PERMISSION_READ).await?;
    Ok(Json(DataResponse { data: readers }))
}
