//! Authority-tree position models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tabulate_core::roles::Role;
use tabulate_core::types::{DbId, Timestamp};

/// A row from the `positions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Position {
    pub id: DbId,
    pub name: String,
    pub parent_id: Option<DbId>,
    pub role: String,
    pub user_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new position node.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePosition {
    pub name: String,
    pub parent_id: Option<DbId>,
    pub role: Role,
    pub user_id: Option<DbId>,
}

/// DTO for moving a position under a new parent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePosition {
    pub parent_id: Option<DbId>,
}

/// The creator's resolved approval chain, walked upward from an expert
/// position. Missing links mean the flow is defective and table creation
/// must be refused.
#[derive(Debug, Clone, FromRow)]
pub struct AuthorityChain {
    pub expert_id: DbId,
    pub manager_id: Option<DbId>,
    pub deputy_id: Option<DbId>,
    pub boss_id: Option<DbId>,
}

/// A position surfaced by the oversight view: either unbound or bound to
/// an inactive user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttentionPosition {
    pub position_id: DbId,
    pub position_name: String,
    pub role: String,
    pub user_id: Option<DbId>,
}
