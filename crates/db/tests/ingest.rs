//! Integration tests for the transactional bulk ingest.

mod common;

use common::{
    bind_unit_user, seed_authority_chain, seed_table, seed_unit, seed_user, seed_write_grant,
};
use serde_json::json;
use sqlx::PgPool;
use tabulate_core::grant;
use tabulate_db::repositories::{AccessGrantRepo, DataRowRepo};

fn row(phone: &str) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert("phone".to_string(), json!(phone));
    map.insert("note".to_string(), serde_json::Value::Null);
    map
}

#[sqlx::test(migrations = "./migrations")]
async fn ingest_writes_rows_and_flips_grant_status(pool: PgPool) {
    let fixture = seed_authority_chain(&pool).await;
    let series_id = seed_table(&pool, &fixture, "Budget", 4).await;
    let unit_id = seed_unit(&pool, "Branch 1", fixture.manager_position).await;
    let submitter = seed_user(&pool, "Submitter", true).await;
    bind_unit_user(&pool, unit_id, submitter).await;
    seed_write_grant(&pool, series_id, unit_id, grant::STATUS_NOT_SENT).await;

    let rows: Vec<_> = (0..7).map(|i| row(&format!("0912345678{i}"))).collect();
    let written = DataRowRepo::ingest_submission(&pool, series_id, unit_id, submitter, &rows)
        .await
        .unwrap();

    assert_eq!(written, 7);
    assert_eq!(DataRowRepo::count_for_series(&pool, series_id).await.unwrap(), 7);

    let grant_row = AccessGrantRepo::find(&pool, series_id, unit_id, grant::PERMISSION_WRITE)
        .await
        .unwrap()
        .expect("grant exists");
    assert_eq!(grant_row.status, grant::STATUS_SENT);

    let (log_user,): (i64,) = sqlx::query_as(
        "SELECT user_id FROM submission_logs WHERE table_series_id = $1 AND unit_id = $2",
    )
    .bind(series_id)
    .bind(unit_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(log_user, submitter);
}

#[sqlx::test(migrations = "./migrations")]
async fn resubmission_updates_the_existing_log_row(pool: PgPool) {
    let fixture = seed_authority_chain(&pool).await;
    let series_id = seed_table(&pool, &fixture, "Budget", 4).await;
    let unit_id = seed_unit(&pool, "Branch 1", fixture.manager_position).await;
    let first = seed_user(&pool, "First", true).await;
    bind_unit_user(&pool, unit_id, first).await;
    seed_write_grant(&pool, series_id, unit_id, grant::STATUS_NOT_SENT).await;

    DataRowRepo::ingest_submission(&pool, series_id, unit_id, first, &[row("09123456780")])
        .await
        .unwrap();

    let second = seed_user(&pool, "Second", true).await;
    DataRowRepo::ingest_submission(&pool, series_id, unit_id, second, &[row("09123456781")])
        .await
        .unwrap();

    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT user_id FROM submission_logs WHERE table_series_id = $1 AND unit_id = $2",
    )
    .bind(series_id)
    .bind(unit_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, second);
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_ingest_persists_nothing(pool: PgPool) {
    let fixture = seed_authority_chain(&pool).await;
    let series_id = seed_table(&pool, &fixture, "Budget", 4).await;
    let unit_id = seed_unit(&pool, "Branch 1", fixture.manager_position).await;
    seed_write_grant(&pool, series_id, unit_id, grant::STATUS_NOT_SENT).await;

    // The submitting user does not exist, so the submission-log insert
    // fails after the data rows were already written in this call.
    let missing_user = 999_999;
    let rows: Vec<_> = (0..3).map(|i| row(&format!("0912345678{i}"))).collect();
    let result =
        DataRowRepo::ingest_submission(&pool, series_id, unit_id, missing_user, &rows).await;

    assert!(result.is_err());
    assert_eq!(DataRowRepo::count_for_series(&pool, series_id).await.unwrap(), 0);

    let grant_row = AccessGrantRepo::find(&pool, series_id, unit_id, grant::PERMISSION_WRITE)
        .await
        .unwrap()
        .expect("grant exists");
    assert_eq!(grant_row.status, grant::STATUS_NOT_SENT);
}

#[sqlx::test(migrations = "./migrations")]
async fn write_grant_replacement_is_wholesale(pool: PgPool) {
    let fixture = seed_authority_chain(&pool).await;
    let series_id = seed_table(&pool, &fixture, "Budget", 4).await;
    let unit_a = seed_unit(&pool, "Branch A", fixture.manager_position).await;
    let unit_b = seed_unit(&pool, "Branch B", fixture.manager_position).await;

    AccessGrantRepo::replace_write_grants(&pool, series_id, &[unit_a, unit_b])
        .await
        .unwrap();
    let grants = AccessGrantRepo::list_for_series(&pool, series_id, grant::PERMISSION_WRITE)
        .await
        .unwrap();
    assert_eq!(grants.len(), 2);

    AccessGrantRepo::replace_write_grants(&pool, series_id, &[unit_b])
        .await
        .unwrap();
    let grants = AccessGrantRepo::list_for_series(&pool, series_id, grant::PERMISSION_WRITE)
        .await
        .unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].unit_id, unit_b);
    // Replacement resets the submission status.
    assert_eq!(grants[0].status, grant::STATUS_NOT_SENT);

    AccessGrantRepo::replace_write_grants(&pool, series_id, &[]).await.unwrap();
    let grants = AccessGrantRepo::list_for_series(&pool, series_id, grant::PERMISSION_WRITE)
        .await
        .unwrap();
    assert!(grants.is_empty());
}
