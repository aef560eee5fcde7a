//! Handlers for the unit-side submission flow: the bulk-import pipeline,
//! the template download, the table listing, and the supervisory review.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use tabulate_core::error::CoreError;
use tabulate_core::export::{csv_line, format_csv_cell, template_filename};
use tabulate_core::grant;
use tabulate_core::normalize::normalize_persian;
use tabulate_core::roles::Role;
use tabulate_core::schema::{CellViolation, CompiledSchema};
use tabulate_core::types::DbId;
use tabulate_core::workflow;
use tabulate_db::models::access_grant::{ReviewAction, ReviewSubmission};
use tabulate_db::models::unit::Unit;
use tabulate_db::repositories::{AccessGrantRepo, DataRowRepo, TableRepo, UnitRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Violations stop being collected once this many rows have failed;
/// scanning stops with them.
pub const MAX_VIOLATIONS: usize = 20;

/// Outcome of a submission. Row-level validation failures are a business
/// outcome, not an error: the report carries them and nothing is
/// persisted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub accepted: bool,
    pub row_count: u64,
    pub violations: Vec<RowViolations>,
}

/// The violations of one rejected row. `row` is the 1-based line number
/// in the submitted file (the header is line 1).
#[derive(Debug, Serialize)]
pub struct RowViolations {
    pub row: usize,
    pub cells: Vec<CellViolation>,
}

/// POST /api/v1/units/tables/{table_id}/submissions
///
/// The bulk-import pipeline: precondition check, archive validation,
/// normalization, row validation against the compiled schema, and the
/// all-or-nothing ingest.
pub async fn submit_table_data(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    auth.require_role(Role::Unit)?;
    let unit = require_unit(&state, &auth).await?;

    let series = TableRepo::find_series(&state.pool, table_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "TableSeries",
            id: table_id,
        })?;

    let grant_row =
        AccessGrantRepo::find(&state.pool, table_id, unit.id, grant::PERMISSION_WRITE).await?;
    let grant_row = match grant_row {
        Some(g) if workflow::is_finalized(series.approval_level) => g,
        _ => return Err(CoreError::NoAccess.into()),
    };
    if !grant::accepts_submission(&grant_row.status) {
        return Err(CoreError::DuplicateEntry(
            "a submission for this table has already been processed".to_string(),
        )
        .into());
    }

    let definition = TableRepo::find_definition(&state.pool, series.table_definition_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "TableDefinition",
            id: series.table_definition_id,
        })?;
    let schema = CompiledSchema::compile(&definition.columns.0)?;

    let csv_text = extract_single_entry(&body)?;
    let (rows, violations) = parse_and_validate(&csv_text, &schema)?;

    if !violations.is_empty() {
        tracing::info!(
            user_id = auth.user_id,
            table_id,
            unit_id = unit.id,
            rejected_rows = violations.len(),
            "Submission rejected by row validation"
        );
        return Ok(Json(DataResponse {
            data: ImportReport {
                accepted: false,
                row_count: 0,
                violations,
            },
        }));
    }

    let written =
        DataRowRepo::ingest_submission(&state.pool, table_id, unit.id, auth.user_id, &rows)
            .await?;

    tracing::info!(
        user_id = auth.user_id,
        table_id,
        unit_id = unit.id,
        rows = written,
        "Submission ingested"
    );

    Ok(Json(DataResponse {
        data: ImportReport {
            accepted: true,
            row_count: written,
            violations: Vec::new(),
        },
    }))
}

/// GET /api/v1/units/tables/{table_id}/template
///
/// Header-only CSV template for a table the unit may still submit to.
pub async fn download_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    auth.require_role(Role::Unit)?;
    let unit = require_unit(&state, &auth).await?;

    let grant_row =
        AccessGrantRepo::find(&state.pool, table_id, unit.id, grant::PERMISSION_WRITE)
            .await?
            .ok_or(CoreError::NoAccess)?;
    if !grant::accepts_submission(&grant_row.status) {
        return Err(CoreError::DuplicateEntry(
            "a submission for this table has already been processed".to_string(),
        )
        .into());
    }

    let settings = TableRepo::settings(&state.pool, table_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "TableSeries",
            id: table_id,
        })?;

    let header = csv_line(
        settings
            .columns
            .0
            .iter()
            .map(|c| format_csv_cell(&serde_json::Value::String(c.name.clone()))),
    );

    let filename = template_filename(&settings.title);
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        header,
    ))
}

/// Query parameters for the unit-side table listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTablesParams {
    pub active: Option<bool>,
    pub page: Option<i64>,
}

/// GET /api/v1/units/tables
///
/// Finalized, write-granted tables for the caller's unit, partitioned by
/// deadline.
pub async fn list_unit_tables(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<UnitTablesParams>,
) -> AppResult<impl IntoResponse> {
    auth.require_role(Role::Unit)?;
    let unit = require_unit(&state, &auth).await?;

    let rows = AccessGrantRepo::list_unit_tables(
        &state.pool,
        unit.id,
        params.active.unwrap_or(true),
        params.page.unwrap_or(1),
    )
    .await?;

    Ok(Json(DataResponse { data: rows }))
}

/// POST /api/v1/units/tables/{table_id}/review
///
/// Supervisory approve/disapprove of a unit's submission. Requires the
/// caller to supervise the unit, the deadline to be open, and the grant
/// to sit exactly in `sent`.
pub async fn review_submission(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(table_id): Path<DbId>,
    Json(input): Json<ReviewSubmission>,
) -> AppResult<impl IntoResponse> {
    auth.require_role(Role::Supervisor)?;

    let unit = UnitRepo::find_by_id(&state.pool, input.unit_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Unit",
            id: input.unit_id,
        })?;
    if unit.supervisor_position_id != auth.require_position()? {
        return Err(CoreError::NoAccess.into());
    }

    let series = TableRepo::find_series(&state.pool, table_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "TableSeries",
            id: table_id,
        })?;
    if series.deadline < chrono::Utc::now() {
        return Err(CoreError::NoAccess.into());
    }

    let grant_row =
        AccessGrantRepo::find(&state.pool, table_id, unit.id, grant::PERMISSION_WRITE)
            .await?
            .ok_or(CoreError::NoAccess)?;
    if !grant::accepts_review(&grant_row.status) {
        return Err(CoreError::NoAccess.into());
    }

    match input.action {
        ReviewAction::Approve => {
            AccessGrantRepo::set_review_status(
                &state.pool,
                table_id,
                unit.id,
                grant::STATUS_APPROVED,
                None,
            )
            .await?;
        }
        ReviewAction::Disapprove => {
            let comment = input.comment.as_deref().ok_or_else(|| {
                CoreError::UnexpectedData("a disapproval requires a comment".to_string())
            })?;
            AccessGrantRepo::set_review_status(
                &state.pool,
                table_id,
                unit.id,
                grant::STATUS_DISAPPROVED,
                Some(comment),
            )
            .await?;
        }
    }

    tracing::info!(
        user_id = auth.user_id,
        table_id,
        unit_id = unit.id,
        action = ?input.action,
        "Submission reviewed"
    );

    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Resolve the caller's unit binding or fail with `NoAccess`.
async fn require_unit(state: &AppState, auth: &AuthUser) -> AppResult<Unit> {
    UnitRepo::find_for_user(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::NoAccess))
}

/// Open the submission archive and return its single entry as text.
fn extract_single_entry(bytes: &[u8]) -> AppResult<String> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| CoreError::InvalidArchive(e.to_string()))?;

    if archive.len() != 1 {
        return Err(CoreError::InvalidArchive(
            "archive must contain exactly one entry".to_string(),
        )
        .into());
    }

    let mut entry = archive
        .by_index(0)
        .map_err(|e| CoreError::InvalidArchive(e.to_string()))?;
    let mut raw = Vec::new();
    std::io::Read::read_to_end(&mut entry, &mut raw)
        .map_err(|e| CoreError::InvalidArchive(e.to_string()))?;

    let text = String::from_utf8(raw)
        .map_err(|_| CoreError::InvalidArchive("entry is not valid UTF-8".to_string()))?;
    // Tolerate a UTF-8 byte-order mark.
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Parse the normalized CSV and validate every row against the compiled
/// schema. Cells reading `NULL`, `null`, or empty are null; violations
/// are reported with the file line number (header is line 1).
fn parse_and_validate(
    text: &str,
    schema: &CompiledSchema,
) -> AppResult<(Vec<serde_json::Map<String, serde_json::Value>>, Vec<RowViolations>)> {
    let normalized = normalize_persian(text);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Fields)
        .from_reader(normalized.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CoreError::UnexpectedData(format!("invalid CSV header: {e}")))?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    let mut violations = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| CoreError::UnexpectedData(format!("invalid CSV row: {e}")))?;

        let mut row = serde_json::Map::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            let value = match cell {
                "" | "NULL" | "null" => serde_json::Value::Null,
                other => serde_json::Value::String(other.to_string()),
            };
            row.insert(header.clone(), value);
        }

        let cells = schema.validate_row(&row);
        if !cells.is_empty() {
            violations.push(RowViolations {
                row: index + 2,
                cells,
            });
            if violations.len() >= MAX_VIOLATIONS {
                break;
            }
        }

        rows.push(row);
    }

    Ok((rows, violations))
}
