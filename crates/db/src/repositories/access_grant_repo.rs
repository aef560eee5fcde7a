//! Repository for the `access_grants` table.

use sqlx::{PgPool, QueryBuilder};
use tabulate_core::grant;
use tabulate_core::types::DbId;

use crate::models::access_grant::{AccessGrant, GrantWithUnit, UnitTableRow};

/// Column list for access_grants queries.
const COLUMNS: &str =
    "id, table_series_id, unit_id, permission, status, comment, created_at, updated_at";

/// Page size for unit-side table listings.
const PAGE_SIZE: i64 = 20;

/// Provides grant CRUD and the status sub-state transitions.
pub struct AccessGrantRepo;

impl AccessGrantRepo {
    /// Find the grant for a (series, unit, permission) triple.
    pub async fn find(
        pool: &PgPool,
        series_id: DbId,
        unit_id: DbId,
        permission: &str,
    ) -> Result<Option<AccessGrant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM access_grants
             WHERE table_series_id = $1 AND unit_id = $2 AND permission = $3"
        );
        sqlx::query_as::<_, AccessGrant>(&query)
            .bind(series_id)
            .bind(unit_id)
            .bind(permission)
            .fetch_optional(pool)
            .await
    }

    /// Whether the unit holds any grant for the series.
    pub async fn any_for_unit(
        pool: &PgPool,
        series_id: DbId,
        unit_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM access_grants
                WHERE table_series_id = $1 AND unit_id = $2
            )",
        )
        .bind(series_id)
        .bind(unit_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Wholesale write-grant replacement: delete every write grant for the
    /// series and insert fresh `notSent` grants for `unit_ids` (an empty
    /// list is a delete-all), in one transaction.
    pub async fn replace_write_grants(
        pool: &PgPool,
        series_id: DbId,
        unit_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM access_grants WHERE table_series_id = $1 AND permission = $2")
            .bind(series_id)
            .bind(grant::PERMISSION_WRITE)
            .execute(&mut *tx)
            .await?;

        if !unit_ids.is_empty() {
            let mut builder = QueryBuilder::new(
                "INSERT INTO access_grants (table_series_id, unit_id, permission, status) ",
            );
            builder.push_values(unit_ids, |mut row, unit_id| {
                row.push_bind(series_id)
                    .push_bind(unit_id)
                    .push_bind(grant::PERMISSION_WRITE)
                    .push_bind(grant::STATUS_NOT_SENT);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await
    }

    /// Insert a read grant for a unit.
    pub async fn insert_read(
        pool: &PgPool,
        series_id: DbId,
        unit_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO access_grants (table_series_id, unit_id, permission, status)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(series_id)
        .bind(unit_id)
        .bind(grant::PERMISSION_READ)
        .bind(grant::STATUS_NOT_SENT)
        .execute(pool)
        .await
        .map(|_| ())
    }

    /// Remove a unit's read grant.
    pub async fn delete_read(
        pool: &PgPool,
        series_id: DbId,
        unit_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "DELETE FROM access_grants
             WHERE table_series_id = $1 AND unit_id = $2 AND permission = $3",
        )
        .bind(series_id)
        .bind(unit_id)
        .bind(grant::PERMISSION_READ)
        .execute(pool)
        .await
        .map(|_| ())
    }

    /// Grants of one permission kind for a series, joined with their unit.
    pub async fn list_for_series(
        pool: &PgPool,
        series_id: DbId,
        permission: &str,
    ) -> Result<Vec<GrantWithUnit>, sqlx::Error> {
        sqlx::query_as::<_, GrantWithUnit>(
            "SELECT g.unit_id, u.name AS unit_name, g.permission, g.status, g.comment
             FROM access_grants g
             JOIN units u ON u.id = g.unit_id
             WHERE g.table_series_id = $1 AND g.permission = $2
             ORDER BY u.name ASC",
        )
        .bind(series_id)
        .bind(permission)
        .fetch_all(pool)
        .await
    }

    /// Record the supervisory review outcome on a write grant.
    pub async fn set_review_status(
        pool: &PgPool,
        series_id: DbId,
        unit_id: DbId,
        status: &str,
        comment: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE access_grants
             SET status = $1, comment = $2, updated_at = now()
             WHERE table_series_id = $3 AND unit_id = $4 AND permission = $5",
        )
        .bind(status)
        .bind(comment)
        .bind(series_id)
        .bind(unit_id)
        .bind(grant::PERMISSION_WRITE)
        .execute(pool)
        .await
        .map(|_| ())
    }

    /// Finalized, write-granted tables for a unit, partitioned by whether
    /// the deadline has passed. Paginated, newest deadline first.
    pub async fn list_unit_tables(
        pool: &PgPool,
        unit_id: DbId,
        active: bool,
        page: i64,
    ) -> Result<Vec<UnitTableRow>, sqlx::Error> {
        let deadline_filter = if active {
            "ts.deadline >= now()"
        } else {
            "ts.deadline < now()"
        };
        let query = format!(
            "SELECT ts.id, tt.title, ts.serial, ts.deadline, g.status, g.comment
             FROM access_grants g
             JOIN table_series ts ON ts.id = g.table_series_id
             JOIN table_definitions td ON td.id = ts.table_definition_id
             JOIN table_titles tt ON tt.id = td.table_title_id
             WHERE g.unit_id = $1
               AND g.permission = $2
               AND ts.approval_level = 4
               AND {deadline_filter}
             ORDER BY ts.deadline DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, UnitTableRow>(&query)
            .bind(unit_id)
            .bind(grant::PERMISSION_WRITE)
            .bind(PAGE_SIZE)
            .bind((page.max(1) - 1) * PAGE_SIZE)
            .fetch_all(pool)
            .await
    }
}
