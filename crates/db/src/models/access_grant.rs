//! Access-grant models and review DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tabulate_core::types::{DbId, Timestamp};

/// A row from the `access_grants` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccessGrant {
    pub id: DbId,
    pub table_series_id: DbId,
    pub unit_id: DbId,
    pub permission: String,
    pub status: String,
    pub comment: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A grant joined with its unit, for reader/writer listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GrantWithUnit {
    pub unit_id: DbId,
    pub unit_name: String,
    pub permission: String,
    pub status: String,
    pub comment: Option<String>,
}

/// DTO for the wholesale write-grant replacement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetWriteAccess {
    pub units: Vec<DbId>,
}

/// DTO for the read-grant add/remove toggle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetReadAccess {
    pub unit_id: DbId,
    pub action: ReadAccessAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadAccessAction {
    Add,
    Remove,
}

/// DTO for the supervisory review of a unit's submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub unit_id: DbId,
    pub action: ReviewAction,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Disapprove,
}

/// A write-granted table as listed for a submitting unit.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UnitTableRow {
    pub id: DbId,
    pub title: String,
    pub serial: String,
    pub deadline: Timestamp,
    pub status: String,
    pub comment: Option<String>,
}
