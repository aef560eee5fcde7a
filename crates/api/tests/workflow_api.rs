//! HTTP-level integration tests for table creation and the approval
//! workflow.

mod common;

use axum::http::StatusCode;
use common::{
    assert_error_code, body_json, build_test_app, get, post_json, seed_authority_chain,
    seed_position, seed_unit, token_for,
};
use serde_json::json;
use sqlx::PgPool;

fn table_body(name: &str) -> serde_json::Value {
    json!({
        "tableName": name,
        "deadline": "2100-01-01T00:00:00Z",
        "fields": [
            { "name": "phone", "model": "phoneNumber", "nullable": false },
            { "name": "answer", "model": "comboBox", "nullable": true,
              "comboBoxValues": ["yes", "no"] }
        ]
    })
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_requires_expert_role_and_permission(pool: PgPool) {
    let fixture = seed_authority_chain(&pool).await;

    // Right role, missing permission.
    let token = token_for(fixture.expert_user, Some(fixture.expert_position), "expert", &[]);
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/tables",
        &token,
        table_body("Budget"),
    )
    .await;
    assert_error_code(response, StatusCode::FORBIDDEN, "NO_ACCESS").await;

    // Right permission, wrong role.
    let token = token_for(
        fixture.manager_user,
        Some(fixture.manager_position),
        "manager",
        &["tableCreate"],
    );
    let response = post_json(
        build_test_app(pool),
        "/api/v1/tables",
        &token,
        table_body("Budget"),
    )
    .await;
    assert_error_code(response, StatusCode::FORBIDDEN, "NO_ACCESS").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_fails_without_a_complete_chain(pool: PgPool) {
    let fixture = seed_authority_chain(&pool).await;
    // An expert attached directly under the boss has no deputy/boss links
    // above its immediate parent.
    let orphan_user = common::seed_user(&pool, "Orphan").await;
    let orphan_position = seed_position(
        &pool,
        "Detached Desk",
        Some(fixture.boss_position),
        "expert",
        Some(orphan_user),
    )
    .await;

    let token = token_for(orphan_user, Some(orphan_position), "expert", &["tableCreate"]);
    let response = post_json(
        build_test_app(pool),
        "/api/v1/tables",
        &token,
        table_body("Budget"),
    )
    .await;
    assert_error_code(response, StatusCode::CONFLICT, "FLOW_DEFECT").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_title_is_rejected(pool: PgPool) {
    let fixture = seed_authority_chain(&pool).await;
    let token = token_for(
        fixture.expert_user,
        Some(fixture.expert_position),
        "expert",
        &["tableCreate"],
    );

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/tables",
        &token,
        table_body("Budget"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(
        build_test_app(pool),
        "/api/v1/tables",
        &token,
        table_body("Budget"),
    )
    .await;
    assert_error_code(response, StatusCode::CONFLICT, "DUPLICATE_ENTRY").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn combo_values_on_other_models_are_rejected(pool: PgPool) {
    let fixture = seed_authority_chain(&pool).await;
    let token = token_for(
        fixture.expert_user,
        Some(fixture.expert_position),
        "expert",
        &["tableCreate"],
    );

    let body = json!({
        "tableName": "Broken",
        "deadline": "2100-01-01T00:00:00Z",
        "fields": [
            { "name": "phone", "model": "phoneNumber", "nullable": false,
              "comboBoxValues": ["oops"] }
        ]
    });
    let response = post_json(build_test_app(pool), "/api/v1/tables", &token, body).await;
    assert_error_code(response, StatusCode::FORBIDDEN, "NO_ACCESS").await;
}

/// The full approval chain: every role approves in order, each one
/// acknowledging its predecessor's transition first.
#[sqlx::test(migrations = "../db/migrations")]
async fn full_approval_chain_finalizes_the_table(pool: PgPool) {
    let fixture = seed_authority_chain(&pool).await;

    let expert = token_for(
        fixture.expert_user,
        Some(fixture.expert_position),
        "expert",
        &["tableCreate"],
    );
    let manager = token_for(
        fixture.manager_user,
        Some(fixture.manager_position),
        "manager",
        &[],
    );
    let deputy = token_for(
        fixture.deputy_user,
        Some(fixture.deputy_position),
        "deputy",
        &[],
    );
    let boss = token_for(fixture.boss_user, Some(fixture.boss_position), "boss", &[]);

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/tables",
        &expert,
        table_body("Budget"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let table_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let approve = format!("/api/v1/tables/{table_id}/approve");
    let acknowledge = format!("/api/v1/tables/{table_id}/acknowledge");

    // Disapproval is meaningless at level 0.
    let response = post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/tables/{table_id}/disapprove"),
        &expert,
        json!({}),
    )
    .await;
    assert_error_code(response, StatusCode::FORBIDDEN, "NO_ACCESS").await;

    // Expert approves: 0 -> 1.
    let response = post_json(build_test_app(pool.clone()), &approve, &expert, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The manager cannot act before acknowledging the expert's approval.
    let response = post_json(build_test_app(pool.clone()), &approve, &manager, json!({})).await;
    assert_error_code(response, StatusCode::FORBIDDEN, "NO_ACCESS").await;

    let response = post_json(build_test_app(pool.clone()), &acknowledge, &manager, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let settings = body_json(response).await;
    assert_eq!(settings["data"]["status"], "approved");

    // Manager approves: 1 -> 2; deputy acknowledges and approves: 2 -> 3.
    let response = post_json(build_test_app(pool.clone()), &approve, &manager, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    post_json(build_test_app(pool.clone()), &acknowledge, &deputy, json!({})).await;
    let response = post_json(build_test_app(pool.clone()), &approve, &deputy, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The boss must acknowledge before acting too.
    let response = post_json(build_test_app(pool.clone()), &approve, &boss, json!({})).await;
    assert_error_code(response, StatusCode::FORBIDDEN, "NO_ACCESS").await;
    post_json(build_test_app(pool.clone()), &acknowledge, &boss, json!({})).await;
    let response = post_json(build_test_app(pool.clone()), &approve, &boss, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["approvalLevel"], 4);

    // The table is finalized; a further boss approval is rejected.
    let response = post_json(build_test_app(pool.clone()), &approve, &boss, json!({})).await;
    assert_error_code(response, StatusCode::FORBIDDEN, "NO_ACCESS").await;

    // Finalization enables grant issuance.
    let unit_id = seed_unit(&pool, "Branch 1", fixture.manager_position).await;
    let granter = token_for(
        fixture.expert_user,
        Some(fixture.expert_position),
        "expert",
        &["tablePermission"],
    );
    let response = common::put_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/tables/{table_id}/write-access"),
        &granter,
        json!({ "units": [unit_id] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn write_grants_require_finalization(pool: PgPool) {
    let fixture = seed_authority_chain(&pool).await;
    let expert = token_for(
        fixture.expert_user,
        Some(fixture.expert_position),
        "expert",
        &["tableCreate", "tablePermission"],
    );

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/tables",
        &expert,
        table_body("Budget"),
    )
    .await;
    let table_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let unit_id = seed_unit(&pool, "Branch 1", fixture.manager_position).await;

    let response = common::put_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/tables/{table_id}/write-access"),
        &expert,
        json!({ "units": [unit_id] }),
    )
    .await;
    assert_error_code(response, StatusCode::CONFLICT, "NOT_FINALIZED_TABLE").await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn listing_projects_review_status(pool: PgPool) {
    let fixture = seed_authority_chain(&pool).await;
    let expert = token_for(
        fixture.expert_user,
        Some(fixture.expert_position),
        "expert",
        &["tableCreate"],
    );

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/tables",
        &expert,
        table_body("Budget"),
    )
    .await;
    let table_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = get(build_test_app(pool.clone()), "/api/v1/tables", &expert).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let item = &json["data"][0];
    assert_eq!(item["id"].as_i64().unwrap(), table_id);
    assert_eq!(item["status"], "underReview");
    assert_eq!(item["awaitsMyAction"], true);

    // After the expert approves, the table waits on the manager.
    post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/tables/{table_id}/approve"),
        &expert,
        json!({}),
    )
    .await;
    let response = get(build_test_app(pool), "/api/v1/tables", &expert).await;
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["status"], "approved");
    assert_eq!(json["data"][0]["awaitsMyAction"], false);
}
