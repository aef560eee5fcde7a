//! Table definition and series models.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use tabulate_core::schema::ColumnSpec;
use tabulate_core::types::{DbId, Timestamp};
use validator::Validate;

/// A row from the `table_definitions` table.
#[derive(Debug, Clone, FromRow)]
pub struct TableDefinition {
    pub id: DbId,
    pub table_title_id: DbId,
    pub columns: Json<Vec<ColumnSpec>>,
    pub baseline: Json<Vec<ColumnSpec>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `table_series` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TableSeries {
    pub id: DbId,
    pub table_definition_id: DbId,
    pub approval_level: i16,
    pub previous_approval_level: i16,
    pub deadline: Timestamp,
    pub serial: String,
    pub creator_id: DbId,
    pub expert_position_id: DbId,
    pub manager_position_id: DbId,
    pub deputy_position_id: DbId,
    pub boss_position_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TableSeries {
    /// Whether `position_id` is one of the four resolved approvers.
    pub fn is_flow_member(&self, position_id: DbId) -> bool {
        position_id == self.expert_position_id
            || position_id == self.manager_position_id
            || position_id == self.deputy_position_id
            || position_id == self.boss_position_id
    }
}

/// Joined view of a series with its definition and title, used by the
/// settings, properties, and export paths.
#[derive(Debug, Clone, FromRow)]
pub struct TableSettings {
    pub series_id: DbId,
    pub definition_id: DbId,
    pub title_id: DbId,
    pub title: String,
    pub columns: Json<Vec<ColumnSpec>>,
    pub baseline: Json<Vec<ColumnSpec>>,
    pub deadline: Timestamp,
    pub serial: String,
    pub approval_level: i16,
    pub previous_approval_level: i16,
    pub expert_position_id: DbId,
    pub manager_position_id: DbId,
    pub deputy_position_id: DbId,
    pub boss_position_id: DbId,
}

impl TableSettings {
    /// Whether `position_id` is one of the four resolved approvers.
    pub fn is_flow_member(&self, position_id: DbId) -> bool {
        position_id == self.expert_position_id
            || position_id == self.manager_position_id
            || position_id == self.deputy_position_id
            || position_id == self.boss_position_id
    }
}

/// A series as shown in table listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TableListRow {
    pub id: DbId,
    pub title: String,
    pub serial: String,
    pub deadline: Timestamp,
    pub approval_level: i16,
    pub previous_approval_level: i16,
}

/// DTO for creating a brand-new table (title + definition + series).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTable {
    #[validate(length(min = 1, max = 200))]
    pub table_name: String,
    pub deadline: Timestamp,
    #[validate(length(min = 1))]
    pub fields: Vec<ColumnSpec>,
}

/// DTO for starting a new series on an existing definition.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReuseTable {
    pub definition_id: DbId,
    pub deadline: Timestamp,
    pub fields: Vec<ColumnSpec>,
}

/// DTO for editing a series still at level 0.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditTable {
    #[validate(length(min = 1, max = 200))]
    pub table_name: Option<String>,
    pub deadline: Timestamp,
    #[validate(length(min = 1))]
    pub fields: Vec<ColumnSpec>,
}

/// Fields of a new series row; the caller has already resolved the
/// authority chain and derived the column patterns.
#[derive(Debug, Clone)]
pub struct NewSeries {
    pub deadline: Timestamp,
    pub serial: String,
    pub creator_id: DbId,
    pub expert_position_id: DbId,
    pub manager_position_id: DbId,
    pub deputy_position_id: DbId,
    pub boss_position_id: DbId,
}
