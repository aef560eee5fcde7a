//! Collected data-row model.

use serde::Serialize;
use sqlx::FromRow;
use tabulate_core::types::{DbId, Timestamp};

/// A row from the `data_rows` table. `payload` is an object keyed by
/// column name, validated against the compiled schema before insert.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DataRow {
    pub id: DbId,
    pub table_series_id: DbId,
    pub unit_id: DbId,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}

/// A data row joined with its unit, for the authority-side data view.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DataRowWithUnit {
    pub payload: serde_json::Value,
    pub unit_id: DbId,
    pub unit_name: String,
    pub province: Option<String>,
}
