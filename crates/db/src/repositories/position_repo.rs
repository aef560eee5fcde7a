//! Repository for the `positions` table and the authority-tree queries.
//!
//! Tree walks run as recursive CTEs bounded by [`MAX_TREE_DEPTH`]: a
//! parent chain deeper than the bound indicates corrupted data and the
//! walk fails closed (the target is simply not found within the bound).

use sqlx::PgPool;
use tabulate_core::types::DbId;

use crate::models::position::{AttentionPosition, AuthorityChain, CreatePosition, Position};

/// Column list for positions queries.
const COLUMNS: &str = "id, name, parent_id, role, user_id, created_at, updated_at";

/// Upper bound on ancestor/descendant chain length.
pub const MAX_TREE_DEPTH: i32 = 64;

/// Provides CRUD and closure queries for the authority tree.
pub struct PositionRepo;

impl PositionRepo {
    /// Insert a new position node, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreatePosition) -> Result<Position, sqlx::Error> {
        let query = format!(
            "INSERT INTO positions (name, parent_id, role, user_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Position>(&query)
            .bind(&input.name)
            .bind(input.parent_id)
            .bind(input.role.as_str())
            .bind(input.user_id)
            .fetch_one(pool)
            .await
    }

    /// Find a position by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Position>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM positions WHERE id = $1");
        sqlx::query_as::<_, Position>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Re-attach a position under a new parent (or detach it as a root).
    ///
    /// Acyclicity must have been validated by the caller.
    pub async fn set_parent(
        pool: &PgPool,
        id: DbId,
        parent_id: Option<DbId>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE positions SET parent_id = $1, updated_at = now() WHERE id = $2")
            .bind(parent_id)
            .bind(id)
            .execute(pool)
            .await
            .map(|_| ())
    }

    /// Find the position bound to a user, if any.
    pub async fn find_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Position>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM positions WHERE user_id = $1");
        sqlx::query_as::<_, Position>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Whether `ancestor_id` appears on the bounded parent chain of
    /// `descendant_id`. Equal ids count as ancestry.
    pub async fn is_ancestor(
        pool: &PgPool,
        ancestor_id: DbId,
        descendant_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        if ancestor_id == descendant_id {
            return Ok(true);
        }
        let row: (bool,) = sqlx::query_as(
            "WITH RECURSIVE ancestor_chain(id, parent_id, depth) AS (
                SELECT id, parent_id, 0 FROM positions WHERE id = $1
                UNION ALL
                SELECT p.id, p.parent_id, ac.depth + 1
                FROM positions p
                JOIN ancestor_chain ac ON p.id = ac.parent_id
                WHERE ac.depth < $3
            )
            SELECT EXISTS(SELECT 1 FROM ancestor_chain WHERE id = $2)",
        )
        .bind(descendant_id)
        .bind(ancestor_id)
        .bind(MAX_TREE_DEPTH)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// All positions strictly below `root_id`, bounded by depth.
    pub async fn descendant_subtree(
        pool: &PgPool,
        root_id: DbId,
    ) -> Result<Vec<Position>, sqlx::Error> {
        let query = format!(
            "WITH RECURSIVE descendant_chain AS (
                SELECT {COLUMNS}, 0 AS depth FROM positions WHERE parent_id = $1
                UNION ALL
                SELECT p.id, p.name, p.parent_id, p.role, p.user_id,
                       p.created_at, p.updated_at, dc.depth + 1
                FROM positions p
                JOIN descendant_chain dc ON p.parent_id = dc.id
                WHERE dc.depth < $2
            )
            SELECT {COLUMNS} FROM descendant_chain"
        );
        sqlx::query_as::<_, Position>(&query)
            .bind(root_id)
            .bind(MAX_TREE_DEPTH)
            .fetch_all(pool)
            .await
    }

    /// Positions in the caller's subtree with no bound user.
    pub async fn unbound_in_subtree(
        pool: &PgPool,
        root_id: DbId,
    ) -> Result<Vec<AttentionPosition>, sqlx::Error> {
        sqlx::query_as::<_, AttentionPosition>(
            "WITH RECURSIVE descendant_chain AS (
                SELECT id, name, parent_id, role, user_id, 0 AS depth
                FROM positions WHERE parent_id = $1
                UNION ALL
                SELECT p.id, p.name, p.parent_id, p.role, p.user_id, dc.depth + 1
                FROM positions p
                JOIN descendant_chain dc ON p.parent_id = dc.id
                WHERE dc.depth < $2
            )
            SELECT id AS position_id, name AS position_name, role, user_id
            FROM descendant_chain
            WHERE user_id IS NULL",
        )
        .bind(root_id)
        .bind(MAX_TREE_DEPTH)
        .fetch_all(pool)
        .await
    }

    /// Positions in the caller's subtree whose bound user is inactive.
    pub async fn inactive_in_subtree(
        pool: &PgPool,
        root_id: DbId,
    ) -> Result<Vec<AttentionPosition>, sqlx::Error> {
        sqlx::query_as::<_, AttentionPosition>(
            "WITH RECURSIVE descendant_chain AS (
                SELECT id, name, parent_id, role, user_id, 0 AS depth
                FROM positions WHERE parent_id = $1
                UNION ALL
                SELECT p.id, p.name, p.parent_id, p.role, p.user_id, dc.depth + 1
                FROM positions p
                JOIN descendant_chain dc ON p.parent_id = dc.id
                WHERE dc.depth < $2
            )
            SELECT dc.id AS position_id, dc.name AS position_name, dc.role, dc.user_id
            FROM descendant_chain dc
            JOIN users u ON u.id = dc.user_id
            WHERE u.active = FALSE",
        )
        .bind(root_id)
        .bind(MAX_TREE_DEPTH)
        .fetch_all(pool)
        .await
    }

    /// Walk the creator's ancestry: expert -> manager -> deputy -> boss.
    ///
    /// Missing links come back as `None`; the caller decides whether that
    /// is a flow defect.
    pub async fn resolve_authority_chain(
        pool: &PgPool,
        expert_position_id: DbId,
    ) -> Result<Option<AuthorityChain>, sqlx::Error> {
        sqlx::query_as::<_, AuthorityChain>(
            "SELECT expert.id AS expert_id,
                    manager.id AS manager_id,
                    deputy.id AS deputy_id,
                    boss.id AS boss_id
             FROM positions expert
             LEFT JOIN positions manager ON manager.id = expert.parent_id
             LEFT JOIN positions deputy ON deputy.id = manager.parent_id
             LEFT JOIN positions boss ON boss.id = deputy.parent_id
             WHERE expert.id = $1",
        )
        .bind(expert_position_id)
        .fetch_optional(pool)
        .await
    }
}
