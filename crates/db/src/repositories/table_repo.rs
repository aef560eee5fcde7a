//! Repository for the `table_titles`, `table_definitions`, and
//! `table_series` tables.
//!
//! Workflow level changes go through [`TableRepo::advance_level`], a
//! compare-and-swap update: two approvers racing on the same level cannot
//! both win, the loser observes zero affected rows.

use sqlx::PgPool;
use tabulate_core::types::{DbId, Timestamp};

use crate::models::table::{
    NewSeries, TableDefinition, TableListRow, TableSeries, TableSettings,
};

/// Column list for table_series queries.
const SERIES_COLUMNS: &str = "id, table_definition_id, approval_level, \
    previous_approval_level, deadline, serial, creator_id, expert_position_id, \
    manager_position_id, deputy_position_id, boss_position_id, created_at, updated_at";

/// Column list for definition queries.
const DEFINITION_COLUMNS: &str = "id, table_title_id, columns, baseline, created_at, updated_at";

/// Select list for the joined settings view.
const SETTINGS_COLUMNS: &str = "ts.id AS series_id, td.id AS definition_id, \
    tt.id AS title_id, tt.title, td.columns, td.baseline, ts.deadline, ts.serial, \
    ts.approval_level, ts.previous_approval_level, ts.expert_position_id, \
    ts.manager_position_id, ts.deputy_position_id, ts.boss_position_id";

/// A retitle request carried by a full (non-schema-safe) edit.
#[derive(Debug, Clone)]
pub struct Retitle {
    pub new_title: String,
    pub old_title_id: DbId,
}

/// Provides CRUD and workflow operations for data-collection tables.
pub struct TableRepo;

impl TableRepo {
    /// Whether a table title is already taken.
    pub async fn title_exists(pool: &PgPool, title: &str) -> Result<bool, sqlx::Error> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM table_titles WHERE title = $1)")
                .bind(title)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Find a series by its primary key.
    pub async fn find_series(pool: &PgPool, id: DbId) -> Result<Option<TableSeries>, sqlx::Error> {
        let query = format!("SELECT {SERIES_COLUMNS} FROM table_series WHERE id = $1");
        sqlx::query_as::<_, TableSeries>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a definition by its primary key.
    pub async fn find_definition(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TableDefinition>, sqlx::Error> {
        let query = format!("SELECT {DEFINITION_COLUMNS} FROM table_definitions WHERE id = $1");
        sqlx::query_as::<_, TableDefinition>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The joined settings view of a series (definition + title).
    pub async fn settings(
        pool: &PgPool,
        series_id: DbId,
    ) -> Result<Option<TableSettings>, sqlx::Error> {
        let query = format!(
            "SELECT {SETTINGS_COLUMNS}
             FROM table_series ts
             JOIN table_definitions td ON td.id = ts.table_definition_id
             JOIN table_titles tt ON tt.id = td.table_title_id
             WHERE ts.id = $1"
        );
        sqlx::query_as::<_, TableSettings>(&query)
            .bind(series_id)
            .fetch_optional(pool)
            .await
    }

    /// Create title, definition, and level-0 series in one transaction.
    ///
    /// Returns the new series id.
    pub async fn create(
        pool: &PgPool,
        title: &str,
        columns: &serde_json::Value,
        series: &NewSeries,
    ) -> Result<DbId, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let (title_id,): (DbId,) =
            sqlx::query_as("INSERT INTO table_titles (title) VALUES ($1) RETURNING id")
                .bind(title)
                .fetch_one(&mut *tx)
                .await?;

        let (definition_id,): (DbId,) = sqlx::query_as(
            "INSERT INTO table_definitions (table_title_id, columns, baseline)
             VALUES ($1, $2, $2) RETURNING id",
        )
        .bind(title_id)
        .bind(columns)
        .fetch_one(&mut *tx)
        .await?;

        let series_id = Self::insert_series(&mut tx, definition_id, series).await?;

        tx.commit().await?;
        Ok(series_id)
    }

    /// Start a new series on an existing definition, replacing its column
    /// set, in one transaction. Returns the new series id.
    pub async fn reuse(
        pool: &PgPool,
        definition_id: DbId,
        columns: &serde_json::Value,
        series: &NewSeries,
    ) -> Result<DbId, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE table_definitions SET columns = $1, updated_at = now() WHERE id = $2")
            .bind(columns)
            .bind(definition_id)
            .execute(&mut *tx)
            .await?;

        let series_id = Self::insert_series(&mut tx, definition_id, series).await?;

        tx.commit().await?;
        Ok(series_id)
    }

    /// Schema-safe edit for definitions backing multiple series: replace
    /// the columns (baseline untouched) and move the deadline.
    pub async fn edit_schema_safe(
        pool: &PgPool,
        definition_id: DbId,
        series_id: DbId,
        columns: &serde_json::Value,
        deadline: Timestamp,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE table_definitions SET columns = $1, updated_at = now() WHERE id = $2")
            .bind(columns)
            .bind(definition_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE table_series SET deadline = $1, updated_at = now() WHERE id = $2")
            .bind(deadline)
            .bind(series_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }

    /// Full edit for single-series definitions: replace columns and
    /// baseline together, move the deadline, and optionally retitle.
    pub async fn edit_full(
        pool: &PgPool,
        definition_id: DbId,
        series_id: DbId,
        columns: &serde_json::Value,
        deadline: Timestamp,
        retitle: Option<Retitle>,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        if let Some(retitle) = retitle {
            let (title_id,): (DbId,) =
                sqlx::query_as("INSERT INTO table_titles (title) VALUES ($1) RETURNING id")
                    .bind(&retitle.new_title)
                    .fetch_one(&mut *tx)
                    .await?;

            sqlx::query("UPDATE table_definitions SET table_title_id = $1 WHERE id = $2")
                .bind(title_id)
                .bind(definition_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM table_titles WHERE id = $1")
                .bind(retitle.old_title_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "UPDATE table_definitions SET columns = $1, baseline = $1, updated_at = now()
             WHERE id = $2",
        )
        .bind(columns)
        .bind(definition_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE table_series SET deadline = $1, updated_at = now() WHERE id = $2")
            .bind(deadline)
            .bind(series_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }

    /// Compare-and-swap level transition. Succeeds only when the series
    /// still sits at `expected` with an acknowledged state; returns
    /// whether a row was updated.
    pub async fn advance_level(
        pool: &PgPool,
        series_id: DbId,
        expected: i16,
        new_level: i16,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE table_series
             SET approval_level = $1, updated_at = now()
             WHERE id = $2 AND approval_level = $3 AND previous_approval_level = $3",
        )
        .bind(new_level)
        .bind(series_id)
        .bind(expected)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Acknowledge the current level: `previous_approval_level := level`.
    pub async fn acknowledge_level(
        pool: &PgPool,
        series_id: DbId,
        level: i16,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE table_series SET previous_approval_level = $1, updated_at = now()
             WHERE id = $2",
        )
        .bind(level)
        .bind(series_id)
        .execute(pool)
        .await
        .map(|_| ())
    }

    /// Number of series built on a definition.
    pub async fn series_count_for_definition(
        pool: &PgPool,
        definition_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM table_series WHERE table_definition_id = $1")
                .bind(definition_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Whether any series on the definition is still mid-flight
    /// (approval level below finalized).
    pub async fn has_active_series(
        pool: &PgPool,
        definition_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM table_series
                WHERE table_definition_id = $1 AND approval_level <> 4
            )",
        )
        .bind(definition_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Series where the given position is one of the four approvers,
    /// newest first.
    pub async fn list_for_authority(
        pool: &PgPool,
        position_id: DbId,
    ) -> Result<Vec<TableListRow>, sqlx::Error> {
        sqlx::query_as::<_, TableListRow>(
            "SELECT ts.id, tt.title, ts.serial, ts.deadline,
                    ts.approval_level, ts.previous_approval_level
             FROM table_series ts
             JOIN table_definitions td ON td.id = ts.table_definition_id
             JOIN table_titles tt ON tt.id = td.table_title_id
             WHERE ts.expert_position_id = $1
                OR ts.manager_position_id = $1
                OR ts.deputy_position_id = $1
                OR ts.boss_position_id = $1
             ORDER BY ts.created_at DESC",
        )
        .bind(position_id)
        .fetch_all(pool)
        .await
    }

    async fn insert_series(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        definition_id: DbId,
        series: &NewSeries,
    ) -> Result<DbId, sqlx::Error> {
        let (series_id,): (DbId,) = sqlx::query_as(
            "INSERT INTO table_series
                (table_definition_id, approval_level, previous_approval_level,
                 deadline, serial, creator_id, expert_position_id,
                 manager_position_id, deputy_position_id, boss_position_id)
             VALUES ($1, 0, 0, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(definition_id)
        .bind(series.deadline)
        .bind(&series.serial)
        .bind(series.creator_id)
        .bind(series.expert_position_id)
        .bind(series.manager_position_id)
        .bind(series.deputy_position_id)
        .bind(series.boss_position_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(series_id)
    }
}
