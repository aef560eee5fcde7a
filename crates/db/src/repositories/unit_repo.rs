//! Repository for the `units` and `unit_users` tables.

use sqlx::PgPool;
use tabulate_core::types::DbId;

use crate::models::unit::Unit;

/// Column list for units queries.
const COLUMNS: &str = "id, name, province, supervisor_position_id, created_at, updated_at";

/// Provides lookups for data-entry units.
pub struct UnitRepo;

impl UnitRepo {
    /// Find a unit by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Unit>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM units WHERE id = $1");
        sqlx::query_as::<_, Unit>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Of the given ids, those that actually exist.
    pub async fn existing_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as("SELECT id FROM units WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// The unit a user submits for, if bound to one.
    pub async fn find_for_user(pool: &PgPool, user_id: DbId) -> Result<Option<Unit>, sqlx::Error> {
        let query = format!(
            "SELECT u.id, u.name, u.province, u.supervisor_position_id,
                    u.created_at, u.updated_at
             FROM units u
             JOIN unit_users uu ON uu.unit_id = u.id
             WHERE uu.user_id = $1"
        );
        sqlx::query_as::<_, Unit>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
