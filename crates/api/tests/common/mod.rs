//! Shared helpers for API integration tests.
//!
//! Builds the application router with the production middleware stack,
//! issues access tokens for arbitrary authorization contexts, and seeds
//! organization-chart fixtures directly.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use tabulate_api::auth::jwt::{generate_access_token, JwtConfig};
use tabulate_api::config::ServerConfig;
use tabulate_api::router::build_app_router;
use tabulate_api::state::AppState;
use tabulate_core::types::DbId;

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router with all middleware layers, using
/// the given database pool. Mirrors the router construction in `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Issue an access token for the given authorization context.
pub fn token_for(
    user_id: DbId,
    position_id: Option<DbId>,
    role: &str,
    permissions: &[&str],
) -> String {
    let permissions: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
    generate_access_token(user_id, position_id, role, &permissions, &test_config().jwt)
        .expect("generate token")
}

pub async fn get(app: Router, path: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(path)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(
    app: Router,
    path: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(path)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn put_json(
    app: Router,
    path: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("PUT")
            .uri(path)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_bytes(app: Router, path: &str, token: &str, body: Vec<u8>) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(path)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/zip")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

pub async fn assert_error_code(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code, "unexpected error body: {json}");
}

// ---------------------------------------------------------------------------
// Database fixtures
// ---------------------------------------------------------------------------

/// A full expert-to-boss chain with bound users.
pub struct AuthorityFixture {
    pub expert_position: DbId,
    pub manager_position: DbId,
    pub deputy_position: DbId,
    pub boss_position: DbId,
    pub expert_user: DbId,
    pub manager_user: DbId,
    pub deputy_user: DbId,
    pub boss_user: DbId,
}

pub async fn seed_user(pool: &PgPool, last_name: &str) -> DbId {
    let (id,): (DbId,) = sqlx::query_as(
        "INSERT INTO users (first_name, last_name, active)
         VALUES ('Test', $1, TRUE) RETURNING id",
    )
    .bind(last_name)
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

pub async fn seed_authority_chain(pool: &PgPool) -> AuthorityFixture {
    let boss_user = seed_user(pool, "Boss").await;
    let deputy_user = seed_user(pool, "Deputy").await;
    let manager_user = seed_user(pool, "Manager").await;
    let expert_user = seed_user(pool, "Expert").await;

    let boss_position = seed_position(pool, "Head Office", None, "boss", Some(boss_user)).await;
    let deputy_position = seed_position(
        pool,
        "Deputy Office",
        Some(boss_position),
        "deputy",
        Some(deputy_user),
    )
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
        manager_user,
        deputy_user,
        boss_user,
    }
}

pub async fn seed_unit(pool: &PgPool, name: &str, supervisor_position_id: DbId) -> DbId {
    let (id,): (DbId,) = sqlx::query_as(
        "INSERT INTO units (name, supervisor_position_id) VALUES ($1, $2) RETURNING id",
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

/// Force a series to a given level pair, bypassing the workflow.
pub async fn force_level(pool: &PgPool, series_id: DbId, level: i16, previous: i16) {
    sqlx::query(
        "UPDATE table_series SET approval_level = $1, previous_approval_level = $2 WHERE id = $3",
    )
    .bind(level)
    .bind(previous)
    .bind(series_id)
    .execute(pool)
    .await
    .expect("force level");
}
