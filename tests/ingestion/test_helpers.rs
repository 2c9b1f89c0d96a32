//! Shared helpers for the ingestion tests.

use std::time::Duration;

use actix_web::{App, dev::ServiceResponse, test, web};
use serde_json::Value;
use uuid::Uuid;

use trd_lib::auth::IngestKey;
use trd_lib::config::{DatabaseSettings, IngestLimits};
use trd_lib::db::DbPool;
use trd_lib::entity::project;
use trd_lib::error::json_error_handler;
use trd_lib::models::{Framework, IncomingTest, NewBuild, TestResultInput};
use trd_lib::services::{
    EventBroadcaster, MergeOutcome, MergeRequest, SpecLocks, merge_test_result, register_build,
};

/// API key the test app accepts.
pub const TEST_API_KEY: &str = "test-ingest-key";

/// Generous bounds; tests that need short ones build their own.
pub fn test_limits() -> IngestLimits {
    IngestLimits {
        lock_timeout: Duration::from_secs(5),
        merge_timeout: Duration::from_secs(5),
    }
}

/// A fresh, migrated in-memory database.
///
/// One connection keeps every query on the same SQLite memory database and
/// serializes writers the way Postgres row locks would.
pub async fn create_test_pool() -> DbPool {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        connect_timeout_secs: 5,
    };

    let pool = DbPool::connect(&settings)
        .await
        .expect("Failed to open in-memory database");
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");
    pool
}

/// A migrated SQLite file in a temp directory, shared by several connections.
///
/// Concurrent transactions here really overlap, so only the spec lock keeps
/// merges of one spec from colliding. Keep the `TempDir` alive for the test.
pub async fn create_file_pool(max_connections: u32) -> (DbPool, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let settings = DatabaseSettings {
        url: format!("sqlite://{}?mode=rwc", dir.path().join("trd.db").display()),
        max_connections,
        min_connections: 1,
        connect_timeout_secs: 5,
    };

    let pool = DbPool::connect(&settings)
        .await
        .expect("Failed to open file database");
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");
    (pool, dir)
}

/// Insert a project to register builds against.
pub async fn seed_project(pool: &DbPool) -> project::Model {
    pool.insert_project("webapp-e2e", Uuid::now_v7())
        .await
        .expect("Failed to seed project")
}

/// Register a Cypress build, optionally for a session.
pub async fn seed_build(pool: &DbPool, project: &project::Model, session: Option<&str>) -> i32 {
    let new = NewBuild {
        project_id: project.id,
        session_id: session.map(str::to_string),
        environment: "ci".to_string(),
        framework: Framework::Cypress,
    };
    register_build(pool, new)
        .await
        .expect("Failed to seed build")
        .build
        .id
}

/// A valid incoming test with the given identity and run.
pub fn incoming(title: &str, project: &str, run_number: i32, status: &str) -> IncomingTest {
    TestResultInput {
        title: Some(title.to_string()),
        project: Some(project.to_string()),
        run_number: Some(run_number),
        status: Some(status.to_string()),
        duration_ms: Some(120),
        ..Default::default()
    }
    .validate()
    .expect("test input should be valid")
}

/// A merge request for any build type.
pub fn merge_request(build_id: i32, spec_file: &str, test: IncomingTest) -> MergeRequest {
    MergeRequest {
        build_id,
        spec_file: spec_file.to_string(),
        test,
        framework: None,
    }
}

/// Merge one test directly through the service layer.
pub async fn merge(
    pool: &DbPool,
    locks: &SpecLocks,
    build_id: i32,
    spec_file: &str,
    test: IncomingTest,
) -> trd_lib::error::AppResult<MergeOutcome> {
    let request = merge_request(build_id, spec_file, test);
    merge_test_result(pool, locks, test_limits().merge_timeout, request).await
}

/// Build the app with every route mounted under `/api/v1`.
pub async fn create_test_app(
    pool: &DbPool,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    let limits = test_limits();

    test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(IngestKey::new(TEST_API_KEY.to_string())))
            .app_data(web::Data::new(SpecLocks::new(limits.lock_timeout)))
            .app_data(web::Data::new(limits))
            .app_data(web::Data::new(EventBroadcaster::new()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(web::scope("/api/v1").configure(trd_lib::api::configure_api)),
    )
    .await
}

/// POST a JSON body with the test API key; returns status and parsed body.
pub async fn post_json<S>(app: &S, uri: &str, body: Value) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::post()
        .uri(uri)
        .insert_header(("X-API-Key", TEST_API_KEY))
        .set_json(body)
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// GET a path without credentials; returns status and parsed body.
pub async fn get_json<S>(app: &S, uri: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}
