//! Handlers for table creation, schema editing, the approval workflow,
//! and the authority-side read paths.

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use tabulate_core::error::CoreError;
use tabulate_core::export::{csv_line, export_filename, format_csv_cell};
use tabulate_core::roles::{self, Role};
use tabulate_core::schema::{self, ColumnModel, ColumnSpec};
use tabulate_core::types::{DbId, Timestamp};
use tabulate_core::workflow::{self, Decision, ReviewStatus};
use tabulate_db::models::table::{
    CreateTable, EditTable, NewSeries, ReuseTable, TableListRow, TableSettings,
};
use tabulate_db::repositories::table_repo::Retitle;
use tabulate_db::repositories::{
    AccessGrantRepo, DataRowRepo, PositionRepo, TableRepo, UnitRepo,
};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/tables
///
/// Create a new table: title, definition, and a level-0 series whose
/// approvers are resolved from the creator's ancestry.
pub async fn create_table(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTable>,
) -> AppResult<impl IntoResponse> {
    auth.require_permission(roles::PERM_TABLE_CREATE)?;
    auth.require_role(Role::Expert)?;
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::UnexpectedData(e.to_string())))?;

    if TableRepo::title_exists(&state.pool, &input.table_name).await? {
        return Err(CoreError::DuplicateEntry(format!(
            "a table named '{}' already exists",
            input.table_name
        ))
        .into());
    }

    let position_id = auth.require_position()?;
    let (expert, manager, deputy, boss) = resolve_full_chain(&state, position_id).await?;

    let columns = schema::finalize_columns(input.fields)?;
    let columns_json = serde_json::to_value(&columns)
        .map_err(|e| AppError::InternalError(format!("failed to encode columns: {e}")))?;

    let series = NewSeries {
        deadline: input.deadline,
        serial: new_serial(),
        creator_id: auth.user_id,
        expert_position_id: expert,
        manager_position_id: manager,
        deputy_position_id: deputy,
        boss_position_id: boss,
    };

    let series_id =
        TableRepo::create(&state.pool, &input.table_name, &columns_json, &series).await?;

    tracing::info!(user_id = auth.user_id, series_id, "Table created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: json!({ "id": series_id }),
        }),
    ))
}

/// POST /api/v1/tables/reuse
///
/// Start a new collection round on an existing definition. The new
/// columns are prepended to the definition's current column set; no
/// series on the definition may still be mid-flight.
pub async fn reuse_table(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ReuseTable>,
) -> AppResult<impl IntoResponse> {
    auth.require_permission(roles::PERM_TABLE_CREATE)?;
    auth.require_role(Role::Expert)?;
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::UnexpectedData(e.to_string())))?;

    let definition = TableRepo::find_definition(&state.pool, input.definition_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "TableDefinition",
            id: input.definition_id,
        })?;

    if TableRepo::has_active_series(&state.pool, definition.id).await? {
        return Err(CoreError::ActiveEntryExists.into());
    }

    let position_id = auth.require_position()?;
    let (expert, manager, deputy, boss) = resolve_full_chain(&state, position_id).await?;

    let mut columns = schema::finalize_columns(input.fields)?;
    columns.extend(definition.columns.0.clone());
    let columns_json = serde_json::to_value(&columns)
        .map_err(|e| AppError::InternalError(format!("failed to encode columns: {e}")))?;

    let series = NewSeries {
        deadline: input.deadline,
        serial: new_serial(),
        creator_id: auth.user_id,
        expert_position_id: expert,
        manager_position_id: manager,
        deputy_position_id: deputy,
        boss_position_id: boss,
    };

    let series_id = TableRepo::reuse(&state.pool, definition.id, &columns_json, &series).await?;

    tracing::info!(user_id = auth.user_id, series_id, "Table series reused");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: json!({ "id": series_id }),
        }),
    ))
}

/// PUT /api/v1/tables/{table_id}
///
/// Edit a series still at level 0. A definition shared by several series
/// only accepts schema-safe edits: no rename, and every baseline column
/// must survive unchanged.
pub async fn edit_table(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
    Json(input): Json<EditTable>,
) -> AppResult<impl IntoResponse> {
    auth.require_permission(roles::PERM_TABLE_CREATE)?;
    auth.require_role(Role::Expert)?;
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::UnexpectedData(e.to_string())))?;

    let settings = TableRepo::settings(&state.pool, table_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "TableSeries",
            id: table_id,
        })?;

    if settings.approval_level != workflow::LEVEL_EXPERT {
        return Err(CoreError::NoAccess.into());
    }

    let series_count =
        TableRepo::series_count_for_definition(&state.pool, settings.definition_id).await?;
    let columns = schema::finalize_columns(input.fields)?;
    let columns_json = serde_json::to_value(&columns)
        .map_err(|e| AppError::InternalError(format!("failed to encode columns: {e}")))?;

    if series_count > 1 {
        if input.table_name.is_some() {
            return Err(CoreError::UnexpectedData(
                "a definition shared by several series cannot be renamed".to_string(),
            )
            .into());
        }
        schema::is_missing_in_new(&settings.baseline.0, &columns)?;
        TableRepo::edit_schema_safe(
            &state.pool,
            settings.definition_id,
            table_id,
            &columns_json,
            input.deadline,
        )
        .await?;
    } else {
        let retitle = match input.table_name {
            Some(name) => {
                if TableRepo::title_exists(&state.pool, &name).await? {
                    return Err(CoreError::DuplicateEntry(format!(
                        "a table named '{name}' already exists"
                    ))
                    .into());
                }
                Some(Retitle {
                    new_title: name,
                    old_title_id: settings.title_id,
                })
            }
            None => None,
        };
        TableRepo::edit_full(
            &state.pool,
            settings.definition_id,
            table_id,
            &columns_json,
            input.deadline,
            retitle,
        )
        .await?;
    }

    tracing::info!(user_id = auth.user_id, table_id, "Table edited");

    Ok(StatusCode::NO_CONTENT)
}

/// Request body for the title availability check.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTitle {
    pub table_name: String,
}

/// POST /api/v1/tables/check-title
///
/// Fails with `DUPLICATE_ENTRY` when the title is taken.
pub async fn check_title(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CheckTitle>,
) -> AppResult<impl IntoResponse> {
    auth.require_permission(roles::PERM_TABLE_CREATE)?;

    if TableRepo::title_exists(&state.pool, &input.table_name).await? {
        return Err(CoreError::DuplicateEntry(format!(
            "a table named '{}' already exists",
            input.table_name
        ))
        .into());
    }

    Ok(Json(DataResponse {
        data: json!({ "available": true }),
    }))
}

/// A listed table with its projected review status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableListItem {
    pub id: DbId,
    pub title: String,
    pub serial: String,
    pub deadline: Timestamp,
    pub status: ReviewStatus,
    pub awaits_my_action: bool,
}

/// GET /api/v1/tables
///
/// Tables where the caller is one of the four approvers, with the
/// review status recomputed on read.
pub async fn list_tables(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let position_id = auth.require_position()?;
    let rows = TableRepo::list_for_authority(&state.pool, position_id).await?;

    let items: Vec<TableListItem> = rows
        .into_iter()
        .map(|row: TableListRow| TableListItem {
            status: workflow::review_status(row.approval_level, row.previous_approval_level),
            awaits_my_action: auth.role.approval_level() == Some(row.approval_level),
            id: row.id,
            title: row.title,
            serial: row.serial,
            deadline: row.deadline,
        })
        .collect();

    Ok(Json(DataResponse { data: items }))
}

/// POST /api/v1/tables/{table_id}/approve
pub async fn approve_table(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    transition(auth, state, table_id, Decision::Approve).await
}

/// POST /api/v1/tables/{table_id}/disapprove
pub async fn disapprove_table(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    transition(auth, state, table_id, Decision::Disapprove).await
}

/// Run one workflow transition. The level write is a compare-and-swap;
/// losing the swap to a concurrent approver reads as `NoAccess`, the
/// same failure an unsynchronized state produces.
async fn transition(
    auth: AuthUser,
    state: AppState,
    table_id: DbId,
    decision: Decision,
) -> AppResult<impl IntoResponse> {
    let series = TableRepo::find_series(&state.pool, table_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "TableSeries",
            id: table_id,
        })?;

    let position_id = auth.require_position()?;
    let own_position = match auth.role {
        Role::Boss => series.boss_position_id,
        Role::Deputy => series.deputy_position_id,
        Role::Manager => series.manager_position_id,
        Role::Expert => series.expert_position_id,
        Role::Supervisor | Role::Unit => return Err(CoreError::NoAccess.into()),
    };
    if own_position != position_id {
        return Err(CoreError::NotFound {
            entity: "TableSeries",
            id: table_id,
        }
        .into());
    }

    let new_level = workflow::next_level(
        auth.role,
        series.approval_level,
        series.previous_approval_level,
        decision,
    )?;

    let swapped =
        TableRepo::advance_level(&state.pool, series.id, series.approval_level, new_level).await?;
    if !swapped {
        return Err(CoreError::NoAccess.into());
    }

    tracing::info!(
        user_id = auth.user_id,
        table_id,
        role = auth.role.as_str(),
        new_level,
        "Workflow transition applied"
    );

    Ok(Json(DataResponse {
        data: json!({ "approvalLevel": new_level }),
    }))
}

/// A column as returned to the flow members editing the table. The
/// canonical pattern stays internal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableColumn {
    pub name: String,
    pub model: ColumnModel,
    pub nullable: bool,
    pub combo_box_values: Vec<String>,
}

/// Settings payload for the acknowledge endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSettingsResponse {
    pub id: DbId,
    pub definition_id: DbId,
    pub title: String,
    pub serial: String,
    pub deadline: Timestamp,
    pub approval_level: i16,
    pub previous_approval_level: i16,
    pub status: ReviewStatus,
    pub awaits_my_action: bool,
    pub columns: Vec<EditableColumn>,
}

/// POST /api/v1/tables/{table_id}/acknowledge
///
/// Return the series settings and synchronize
/// `previous_approval_level := approval_level` when the caller's role may
/// acknowledge the current pair. The returned status is projected from
/// the state *before* synchronization.
pub async fn acknowledge_table(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if matches!(auth.role, Role::Supervisor | Role::Unit) {
        return Err(CoreError::UnexpectedData(
            "only workflow roles read table settings".to_string(),
        )
        .into());
    }

    let settings = TableRepo::settings(&state.pool, table_id)
        .await?
        .ok_or(CoreError::NoAccess)?;
    if !settings.is_flow_member(auth.require_position()?) {
        return Err(CoreError::NoAccess.into());
    }

    let status =
        workflow::review_status(settings.approval_level, settings.previous_approval_level);

    if workflow::may_acknowledge(
        auth.role,
        settings.approval_level,
        settings.previous_approval_level,
    ) {
        TableRepo::acknowledge_level(&state.pool, table_id, settings.approval_level).await?;
        tracing::info!(
            user_id = auth.user_id,
            table_id,
            level = settings.approval_level,
            "Approval level acknowledged"
        );
    }

    let columns = settings
        .columns
        .0
        .iter()
        .map(|spec: &ColumnSpec| EditableColumn {
            name: spec.name.clone(),
            model: spec.model,
            nullable: spec.nullable,
            combo_box_values: spec.combo_box_values.clone(),
        })
        .collect();

    Ok(Json(DataResponse {
        data: TableSettingsResponse {
            id: settings.series_id,
            definition_id: settings.definition_id,
            title: settings.title,
            serial: settings.serial,
            deadline: settings.deadline,
            approval_level: settings.approval_level,
            previous_approval_level: settings.previous_approval_level,
            status,
            awaits_my_action: auth.role.approval_level() == Some(settings.approval_level),
            columns,
        },
    }))
}

/// GET /api/v1/tables/{table_id}/properties
///
/// Display-collapsed column list, title, and deadline. Visible to flow
/// members and to members of any unit holding a grant.
pub async fn table_properties(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let settings = load_visible_settings(&auth, &state, table_id, false).await?;

    Ok(Json(DataResponse {
        data: json!({
            "name": settings.title,
            "deadline": settings.deadline,
            "columns": schema::display_columns(&settings.columns.0),
        }),
    }))
}

/// GET /api/v1/tables/{table_id}/data
///
/// Collected rows from units whose submission has been approved.
pub async fn table_data(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let _settings = load_visible_settings(&auth, &state, table_id, true).await?;
    let rows = DataRowRepo::rows_from_approved_units(&state.pool, table_id).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// Query parameters for the export endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub unit_id: Option<DbId>,
}

/// GET /api/v1/tables/{table_id}/export
///
/// Stream the collected rows as CSV in the compiled column order. With
/// `unitId` the export is restricted to one unit's rows.
pub async fn export_table(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
    Query(params): Query<ExportParams>,
) -> AppResult<impl IntoResponse> {
    let settings = load_visible_settings(&auth, &state, table_id, true).await?;
    let column_names: Vec<&str> = settings.columns.0.iter().map(|c| c.name.as_str()).collect();

    let rows = match params.unit_id {
        Some(unit_id) => DataRowRepo::rows_for_unit(&state.pool, table_id, unit_id).await?,
        None => DataRowRepo::rows_for_series(&state.pool, table_id).await?,
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(csv_line(
        column_names
            .iter()
            .map(|name| format_csv_cell(&json!(name))),
    ));
    for row in &rows {
        let cells = column_names.iter().map(|name| {
            let value = row.payload.get(*name).unwrap_or(&serde_json::Value::Null);
            format_csv_cell(value)
        });
        lines.push(csv_line(cells));
    }
    let body = lines.join("\n");

    let filename = export_filename(&settings.title, params.unit_id);
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    ))
}

/// Generate the serial identifier of a new series.
fn new_serial() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Resolve the caller's full approval chain or fail with `FlowDefect`.
async fn resolve_full_chain(
    state: &AppState,
    expert_position_id: DbId,
) -> AppResult<(DbId, DbId, DbId, DbId)> {
    let chain = PositionRepo::resolve_authority_chain(&state.pool, expert_position_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Position",
            id: expert_position_id,
        })?;

    match (chain.manager_id, chain.deputy_id, chain.boss_id) {
        (Some(manager), Some(deputy), Some(boss)) => Ok((chain.expert_id, manager, deputy, boss)),
        _ => Err(CoreError::FlowDefect.into()),
    }
}

/// Load a series' settings and verify the caller may see it: a flow
/// member always may; a unit member may when their unit holds a grant
/// (a read grant when `require_read_grant` is set).
async fn load_visible_settings(
    auth: &AuthUser,
    state: &AppState,
    table_id: DbId,
    require_read_grant: bool,
) -> AppResult<TableSettings> {
    let settings = TableRepo::settings(&state.pool, table_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "TableSeries",
            id: table_id,
        })?;

    if let Some(position_id) = auth.position_id {
        if settings.is_flow_member(position_id) {
            return Ok(settings);
        }
    }

    if let Some(unit) = UnitRepo::find_for_user(&state.pool, auth.user_id).await? {
        let allowed = if require_read_grant {
            AccessGrantRepo::find(
                &state.pool,
                table_id,
                unit.id,
                tabulate_core::grant::PERMISSION_READ,
            )
            .await?
            .is_some()
        } else {
            AccessGrantRepo::any_for_unit(&state.pool, table_id, unit.id).await?
        };
        if allowed {
            return Ok(settings);
        }
    }

    Err(CoreError::NoAccess.into())
}
