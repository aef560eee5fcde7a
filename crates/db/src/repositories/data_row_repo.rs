//! Repository for the `data_rows` and `submission_logs` tables.

use sqlx::types::Json;
use sqlx::{PgPool, QueryBuilder};
use tabulate_core::grant;
use tabulate_core::types::DbId;

use crate::models::data_row::{DataRow, DataRowWithUnit};

/// Column list for data_rows queries.
const COLUMNS: &str = "id, table_series_id, unit_id, payload, created_at";

/// Rows per INSERT statement during ingest.
pub const INSERT_BATCH_SIZE: usize = 500;

/// Provides the transactional ingest and the read paths for collected
/// rows.
pub struct DataRowRepo;

impl DataRowRepo {
    /// Atomically persist a validated submission.
    ///
    /// One transaction covers everything: rows inserted in input order in
    /// batches of [`INSERT_BATCH_SIZE`], the unit's write grant flipped to
    /// `sent`, and the submission log upserted. Any failure rolls the
    /// whole submission back, including batches already written in this
    /// call.
    pub async fn ingest_submission(
        pool: &PgPool,
        series_id: DbId,
        unit_id: DbId,
        user_id: DbId,
        rows: &[serde_json::Map<String, serde_json::Value>],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        for chunk in rows.chunks(INSERT_BATCH_SIZE) {
            let mut builder =
                QueryBuilder::new("INSERT INTO data_rows (table_series_id, unit_id, payload) ");
            builder.push_values(chunk, |mut row, payload| {
                row.push_bind(series_id)
                    .push_bind(unit_id)
                    .push_bind(Json(payload));
            });
            builder.build().execute(&mut *tx).await?;
        }

        sqlx::query(
            "UPDATE access_grants
             SET status = $1, updated_at = now()
             WHERE table_series_id = $2 AND unit_id = $3 AND permission = $4",
        )
        .bind(grant::STATUS_SENT)
        .bind(series_id)
        .bind(unit_id)
        .bind(grant::PERMISSION_WRITE)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO submission_logs (table_series_id, unit_id, user_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (table_series_id, unit_id)
             DO UPDATE SET user_id = EXCLUDED.user_id, submitted_at = now()",
        )
        .bind(series_id)
        .bind(unit_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            series_id,
            unit_id,
            rows = rows.len(),
            "Submission committed"
        );
        Ok(rows.len() as u64)
    }

    /// Every collected row for a series, in insertion order.
    pub async fn rows_for_series(
        pool: &PgPool,
        series_id: DbId,
    ) -> Result<Vec<DataRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM data_rows WHERE table_series_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, DataRow>(&query)
            .bind(series_id)
            .fetch_all(pool)
            .await
    }

    /// One unit's collected rows for a series, in insertion order.
    pub async fn rows_for_unit(
        pool: &PgPool,
        series_id: DbId,
        unit_id: DbId,
    ) -> Result<Vec<DataRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM data_rows
             WHERE table_series_id = $1 AND unit_id = $2
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, DataRow>(&query)
            .bind(series_id)
            .bind(unit_id)
            .fetch_all(pool)
            .await
    }

    /// Rows from units whose submission has been approved, joined with
    /// unit metadata. This is the authority-side data view.
    pub async fn rows_from_approved_units(
        pool: &PgPool,
        series_id: DbId,
    ) -> Result<Vec<DataRowWithUnit>, sqlx::Error> {
        sqlx::query_as::<_, DataRowWithUnit>(
            "SELECT dr.payload, u.id AS unit_id, u.name AS unit_name, u.province
             FROM data_rows dr
             JOIN units u ON u.id = dr.unit_id
             WHERE dr.table_series_id = $1
               AND dr.unit_id IN (
                   SELECT unit_id FROM access_grants
                   WHERE table_series_id = $1
                     AND permission = $2
                     AND status = $3
               )
             ORDER BY dr.id ASC",
        )
        .bind(series_id)
        .bind(grant::PERMISSION_WRITE)
        .bind(grant::STATUS_APPROVED)
        .fetch_all(pool)
        .await
    }

    /// Number of persisted rows for a series.
    pub async fn count_for_series(pool: &PgPool, series_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM data_rows WHERE table_series_id = $1")
                .bind(series_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }
}
