//! Subordinate data-entry unit models.

use serde::Serialize;
use sqlx::FromRow;
use tabulate_core::types::{DbId, Timestamp};

/// A row from the `units` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Unit {
    pub id: DbId,
    pub name: String,
    pub province: Option<String>,
    pub supervisor_position_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
