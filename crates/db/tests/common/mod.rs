//! Shared fixtures for repository integration tests.
//!
//! Inserts rows directly so each test can assemble exactly the
//! organization chart and table state it needs.

#![allow(dead_code)]

use sqlx::PgPool;
use tabulate_core::schema::{self, ColumnModel, ColumnSpec};
use tabulate_core::types::DbId;

pub async fn seed_user(pool: &PgPool, last_name: &str, active: bool) -> DbId {
    let (id,): (DbId,) = sqlx::query_as(
        "INSERT INTO users (first_name, last_name, active)
         VALUES ('Test', $1, $2) RETURNING id",
    )
    .bind(last_name)
    .bind(active)
    .fetch_one(pool)
    .await
    .expect("insert user");
    id
}

pub async fn seed_position(
    pool: &PgPool,
    name: &str,
    parent_id: Option<DbId>,
    role: &str,
    user_id: Option<DbId>,
) -> DbId {
    let (id,): (DbId,) = sqlx::query_as(
        "INSERT INTO positions (name, parent_id, role, user_id)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(parent_id)
    .bind(role)
    .bind(user_id)
    .fetch_one(pool)
    .await
    .expect("insert position");
    id
}

pub async fn seed_unit(pool: &PgPool, name: &str, supervisor_position_id: DbId) -> DbId {
    let (id,): (DbId,) = sqlx::query_as(
        "INSERT INTO units (name, supervisor_position_id)
         VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(supervisor_position_id)
    .fetch_one(pool)
    .await
    .expect("insert unit");
    id
}

pub async fn bind_unit_user(pool: &PgPool, unit_id: DbId, user_id: DbId) {
    sqlx::query("INSERT INTO unit_users (unit_id, user_id) VALUES ($1, $2)")
        .bind(unit_id)
        .bind(user_id)
        .execute(pool)
        .await
        .expect("bind unit user");
}

/// A full expert-to-boss chain with bound users, for workflow tests.
pub struct AuthorityFixture {
    pub expert_position: DbId,
    pub manager_position: DbId,
    pub deputy_position: DbId,
    pub boss_position: DbId,
    pub expert_user: DbId,
}

pub async fn seed_authority_chain(pool: &PgPool) -> AuthorityFixture {
    let boss_user = seed_user(pool, "Boss", true).await;
    let deputy_user = seed_user(pool, "Deputy", true).await;
    let manager_user = seed_user(pool, "Manager", true).await;
    let expert_user = seed_user(pool, "Expert", true).await;

    let boss_position = seed_position(pool, "Head Office", None, "boss", Some(boss_user)).await;
    let deputy_position =
        seed_position(pool, "Deputy Office", Some(boss_position), "deputy", Some(deputy_user))
            .await;
    let manager_position = seed_position(
        pool,
        "Data Department",
        Some(deputy_position),
        "manager",
        Some(manager_user),
    )
    .await;
    let expert_position = seed_position(
        pool,
        "Collection Desk",
        Some(manager_position),
        "expert",
        Some(expert_user),
    )
    .await;

    AuthorityFixture {
        expert_position,
        manager_position,
        deputy_position,
        boss_position,
        expert_user,
    }
}

pub fn sample_columns() -> Vec<ColumnSpec> {
    let specs = vec![
        ColumnSpec {
            name: "phone".to_string(),
            model: ColumnModel::PhoneNumber,
            nullable: false,
            combo_box_values: Vec::new(),
            pattern: String::new(),
        },
        ColumnSpec {
            name: "note".to_string(),
            model: ColumnModel::FreeText,
            nullable: true,
            combo_box_values: Vec::new(),
            pattern: String::new(),
        },
    ];
    schema::finalize_columns(specs).expect("finalize sample columns")
}

/// Insert a title + definition + series at the given level and return
/// the series id.
pub async fn seed_table(
    pool: &PgPool,
    fixture: &AuthorityFixture,
    title: &str,
    level: i16,
) -> DbId {
    let columns = serde_json::to_value(sample_columns()).expect("columns json");

    let (title_id,): (DbId,) =
        sqlx::query_as("INSERT INTO table_titles (title) VALUES ($1) RETURNING id")
            .bind(title)
            .fetch_one(pool)
            .await
            .expect("insert title");

    let (definition_id,): (DbId,) = sqlx::query_as(
        "INSERT INTO table_definitions (table_title_id, columns, baseline)
         VALUES ($1, $2, $2) RETURNING id",
    )
    .bind(title_id)
    .bind(&columns)
    .fetch_one(pool)
    .await
    .expect("insert definition");

    let (series_id,): (DbId,) = sqlx::query_as(
        "INSERT INTO table_series
            (table_definition_id, approval_level, previous_approval_level,
             deadline, serial, creator_id, expert_position_id,
             manager_position_id, deputy_position_id, boss_position_id)
         VALUES ($1, $2, $2, now() + interval '30 days', $3, $4, $5, $6, $7, $8)
         RETURNING id",
    )
    .bind(definition_id)
    .bind(level)
    .bind(uuid::Uuid::new_v4().simple().to_string())
    .bind(fixture.expert_user)
    .bind(fixture.expert_position)
    .bind(fixture.manager_position)
    .bind(fixture.deputy_position)
    .bind(fixture.boss_position)
    .fetch_one(pool)
    .await
    .expect("insert series");

    series_id
}

pub async fn seed_write_grant(pool: &PgPool, series_id: DbId, unit_id: DbId, status: &str) {
    sqlx::query(
        "INSERT INTO access_grants (table_series_id, unit_id, permission, status)
         VALUES ($1, $2, 'write', $3)",
    )
    .bind(series_id)
    .bind(unit_id)
    .bind(status)
    .execute(pool)
    .await
    .expect("insert write grant");
}
