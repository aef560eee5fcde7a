//! Handlers for authority-tree administration and the oversight view.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use tabulate_core::error::CoreError;
use tabulate_core::roles;
use tabulate_core::types::DbId;
use tabulate_db::models::position::{CreatePosition, MovePosition};
use tabulate_db::repositories::PositionRepo;

use crate::authz;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/positions
///
/// Create a new position node. The parent, when given, must exist and
/// must fall under the caller's own authority.
pub async fn create_position(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePosition>,
) -> AppResult<impl IntoResponse> {
    auth.require_permission(roles::PERM_USER_EDITING)?;

    if let Some(parent_id) = input.parent_id {
        PositionRepo::find_by_id(&state.pool, parent_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Position",
                id: parent_id,
            })?;
        authz::ensure_ancestor(&state.pool, auth.require_position()?, parent_id, true).await?;
    }

    let position = PositionRepo::create(&state.pool, &input).await?;

    tracing::info!(
        user_id = auth.user_id,
        position_id = position.id,
        role = %position.role,
        "Position created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: position })))
}

/// PUT /api/v1/positions/{position_id}/parent
///
/// Move a position under a new parent. The edge is validated for
/// acyclicity: a node may not be re-attached beneath its own subtree.
pub async fn move_position(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(position_id): Path<DbId>,
    Json(input): Json<MovePosition>,
) -> AppResult<impl IntoResponse> {
    auth.require_permission(roles::PERM_USER_EDITING)?;

    PositionRepo::find_by_id(&state.pool, position_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Position",
            id: position_id,
        })?;

    if let Some(parent_id) = input.parent_id {
        PositionRepo::find_by_id(&state.pool, parent_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Position",
                id: parent_id,
            })?;
        authz::ensure_acyclic_edge(&state.pool, position_id, parent_id).await?;
    }

    PositionRepo::set_parent(&state.pool, position_id, input.parent_id).await?;

    tracing::info!(
        user_id = auth.user_id,
        position_id,
        parent_id = ?input.parent_id,
        "Position moved"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/positions/attention
///
/// The oversight view: positions in the caller's subtree with no bound
/// user, and positions whose bound user is inactive.
pub async fn attention_positions(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    auth.require_permission(roles::PERM_USER_EDITING)?;
    let root = auth.require_position()?;

    let unbound = PositionRepo::unbound_in_subtree(&state.pool, root).await?;
    let inactive = PositionRepo::inactive_in_subtree(&state.pool, root).await?;

    Ok(Json(DataResponse {
        data: json!({
            "unbound": unbound,
            "inactive": inactive,
        }),
    }))
}
