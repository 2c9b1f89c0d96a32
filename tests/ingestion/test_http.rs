//! HTTP surface: status codes, auth and response bodies.

use actix_web::test;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use trd_lib::entity::build;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_health_is_public() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool).await;

    let (status, body) = get_json(&app, "/api/v1/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (status, body) = get_json(&app, "/api/v1/ready").await;
    assert_eq!(status, 200);
    assert_eq!(body["database"], "connected");
    assert_eq!(body["active_spec_locks"], 0);
    assert_eq!(body["live_subscribers"], 0);
}

/// A finalized session cannot be rejoined; the runner gets a validation error.
#[actix_rt::test]
async fn test_register_finalized_session_is_rejected() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, Some("nightly-42")).await;

    build::Entity::update_many()
        .col_expr(build::Column::Status, Expr::value("passed"))
        .filter(build::Column::Id.eq(build_id))
        .exec(pool.connection())
        .await
        .unwrap();

    let app = create_test_app(&pool).await;
    let (status, body) = post_json(
        &app,
        "/api/v1/build",
        json!({
            "project_id": project.id,
            "session_id": "nightly-42",
            "environment": "ci",
            "type": "cypress"
        }),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["retryable"], false);
    assert!(body["message"].as_str().unwrap().contains("finalized"));

    let builds = pool.list_builds_for_project(project.id).await.unwrap();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].status, "passed");
}

#[actix_rt::test]
async fn test_missing_api_key_is_unauthorized() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/build")
        .set_json(json!({ "project_id": project.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status().as_u16(), 401);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "UNAUTHORIZED");
    assert_eq!(body["retryable"], false);
}

#[actix_rt::test]
async fn test_wrong_api_key_is_unauthorized() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/result")
        .insert_header(("X-API-Key", "not-the-key"))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_rt::test]
async fn test_register_build_created_then_reused() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let app = create_test_app(&pool).await;

    let body = json!({
        "project_id": project.id,
        "type": "playwright",
        "environment": "staging",
        "session_id": "gh-run-88",
    });

    let (status, first) = post_json(&app, "/api/v1/build", body.clone()).await;
    assert_eq!(status, 201);
    assert_eq!(first["success"], true);
    assert_eq!(first["projectId"], project.id.to_string());
    assert_eq!(first["organizationId"], project.organization_id.to_string());

    let (status, second) = post_json(&app, "/api/v1/build", body).await;
    assert_eq!(status, 200);
    assert_eq!(first["buildId"], second["buildId"]);
}

#[actix_rt::test]
async fn test_register_build_validation() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool).await;

    let (status, body) = post_json(&app, "/api/v1/build", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = post_json(
        &app,
        "/api/v1/build",
        json!({ "project_id": "0192f0c4-7a4e-7c3e-9a51-2f6d8e1b3c4d" }),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[actix_rt::test]
async fn test_malformed_body_is_validation_error() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/result")
        .insert_header(("X-API-Key", TEST_API_KEY))
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[actix_rt::test]
async fn test_submit_result_requires_fields() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool).await;

    let (status, body) = post_json(
        &app,
        "/api/v1/result",
        json!({ "spec_file": "login.cy.ts", "test_entry": { "title": "Login", "project": "chrome" } }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("build_id"));

    let (status, body) = post_json(
        &app,
        "/api/v1/result",
        json!({ "build_id": 1, "spec_file": "login.cy.ts", "test_entry": { "project": "chrome" } }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("title"));
}

#[actix_rt::test]
async fn test_submit_result_unknown_build() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool).await;

    let (status, body) = post_json(
        &app,
        "/api/v1/result",
        json!({
            "build_id": 424242,
            "spec_file": "login.cy.ts",
            "test_entry": { "title": "Login", "project": "chrome", "status": "passed" }
        }),
    )
    .await;

    assert_eq!(status, 404);
    assert_eq!(body["retryable"], false);
}

#[actix_rt::test]
async fn test_submit_and_read_back() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, Some("read-back")).await;
    let app = create_test_app(&pool).await;

    let (status, body) = post_json(
        &app,
        "/api/v1/cypress/result",
        json!({
            "build_id": build_id,
            "spec_file": "cypress/e2e/login.cy.ts",
            "test_entry": {
                "title": "Login",
                "project": "chrome",
                "status": "Failed",
                "duration_ms": 2100,
                "error": { "message": "\u{1b}[31mexpected true\u{1b}[0m" },
                "logs": ["cy.visit /login"]
            }
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["spec"], "cypress/e2e/login.cy.ts");
    assert_eq!(body["test_count"], 1);

    let (status, detail) = get_json(&app, &format!("/api/v1/builds/{}", build_id)).await;
    assert_eq!(status, 200);
    assert_eq!(detail["build"]["id"], build_id);
    let test = &detail["specs"][0]["tests"][0];
    assert_eq!(test["status"], "failed");
    assert_eq!(test["unique_key"], "chrome::Login");
    assert_eq!(test["error"]["message"], "expected true");
    assert_eq!(detail["specs"][0]["summary"]["failed"], 1);

    let spec_id = detail["specs"][0]["id"].as_i64().unwrap();
    let (status, spec) = get_json(&app, &format!("/api/v1/spec-results/{}", spec_id)).await;
    assert_eq!(status, 200);
    assert_eq!(spec["spec_file"], "cypress/e2e/login.cy.ts");

    let (status, spec) = get_json(
        &app,
        &format!(
            "/api/v1/builds/{}/specs?spec_file=cypress%2Fe2e%2Flogin.cy.ts",
            build_id
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(spec["id"], spec_id);
}

#[actix_rt::test]
async fn test_framework_route_rejects_other_build_type() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, None).await;
    let app = create_test_app(&pool).await;

    let (status, body) = post_json(
        &app,
        "/api/v1/playwright/result",
        json!({
            "build_id": build_id,
            "spec_file": "tests/login.spec.ts",
            "test_entry": { "title": "Login", "project": "chromium", "status": "passed" }
        }),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[actix_rt::test]
async fn test_read_missing_build_is_not_found() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool).await;

    let (status, body) = get_json(&app, "/api/v1/builds/31337").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, _) = get_json(&app, "/api/v1/spec-results/31337").await;
    assert_eq!(status, 404);
}
