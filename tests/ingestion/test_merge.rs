//! Result merging through the service layer.

use std::time::Duration;

use futures_util::future::join_all;
use sea_orm::{EntityTrait, TransactionTrait};

use trd_lib::entity::project;
use trd_lib::error::AppError;
use trd_lib::models::{
    CanonicalStatus, Framework, MergeKind, SpecResultResponse, SubmitResultRequest,
    TestResultInput,
};
use trd_lib::db::spec_results::{ensure_spec_result, find_spec_result_for_update};
use trd_lib::services::{SpecLocks, merge_test_result, spec_lock_key, stage_merge};

use super::test_helpers::*;

const SPEC: &str = "cypress/e2e/login.cy.ts";

async fn load_spec(pool: &trd_lib::db::DbPool, build_id: i32) -> SpecResultResponse {
    let model = pool
        .find_spec_result(build_id, SPEC)
        .await
        .unwrap()
        .expect("spec aggregate should exist");
    SpecResultResponse::from_model(model).unwrap()
}

/// Concurrent reports for distinct tests of one spec all survive, with
/// transactions running on separate connections.
#[actix_rt::test]
async fn test_concurrent_merges_lose_no_tests() {
    let (pool, _dir) = create_file_pool(4).await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, Some("s-1")).await;
    let locks = SpecLocks::new(Duration::from_secs(5));

    let results = join_all((0..12).map(|i| {
        merge(
            &pool,
            &locks,
            build_id,
            SPEC,
            incoming(&format!("case {}", i), "chrome", 1, "passed"),
        )
    }))
    .await;
    assert!(results.iter().all(Result::is_ok));

    let spec = load_spec(&pool, build_id).await;
    assert_eq!(spec.tests.len(), 12);
    assert_eq!(spec.summary.total, 12);
    assert_eq!(spec.summary.passed, 12);
    assert_eq!(locks.active_keys(), 0);
}

#[actix_rt::test]
async fn test_same_run_update_appends_logs_and_keeps_video() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, None).await;
    let locks = SpecLocks::new(Duration::from_secs(5));

    let mut first = incoming("Login", "chrome", 1, "running");
    first.logs = vec!["visit /login".into()];
    first.video_url = Some("https://cdn.example/login.mp4".into());
    merge(&pool, &locks, build_id, SPEC, first).await.unwrap();

    let mut second = incoming("Login", "chrome", 1, "PASSED");
    second.logs = vec!["submit form".into()];
    let outcome = merge(&pool, &locks, build_id, SPEC, second).await.unwrap();

    assert_eq!(outcome.kind, MergeKind::Updated);
    assert_eq!(outcome.test_count, 1);

    let spec = load_spec(&pool, build_id).await;
    let test = &spec.tests[0];
    assert_eq!(test.logs, vec!["visit /login", "submit form"]);
    assert_eq!(
        test.video_url.as_deref(),
        Some("https://cdn.example/login.mp4")
    );
    assert_eq!(test.status, CanonicalStatus::Passed);
}

/// A failed first attempt and a passing retry are two entries, counted once as flaky.
#[actix_rt::test]
async fn test_retry_appends_new_run() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, None).await;
    let locks = SpecLocks::new(Duration::from_secs(5));

    merge(&pool, &locks, build_id, SPEC, incoming("Login", "chrome", 1, "failed"))
        .await
        .unwrap();
    let outcome = merge(&pool, &locks, build_id, SPEC, incoming("Login", "chrome", 2, "passed"))
        .await
        .unwrap();

    assert_eq!(outcome.kind, MergeKind::Appended);
    assert_eq!(outcome.test_count, 2);

    let spec = load_spec(&pool, build_id).await;
    assert_eq!(spec.tests[0].status, CanonicalStatus::Failed);
    assert_eq!(spec.tests[1].status, CanonicalStatus::Passed);
    assert_eq!(spec.summary.total, 1);
    assert_eq!(spec.summary.passed, 1);
    assert_eq!(spec.summary.flaky, 1);
    assert_eq!(spec.summary.finished, 1);
    assert_eq!(spec.summary.runs, 2);
}

#[actix_rt::test]
async fn test_same_title_in_other_project_is_separate() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, None).await;
    let locks = SpecLocks::new(Duration::from_secs(5));

    merge(&pool, &locks, build_id, SPEC, incoming("Login", "chrome", 1, "passed"))
        .await
        .unwrap();
    merge(&pool, &locks, build_id, SPEC, incoming("Login", "firefox", 1, "failed"))
        .await
        .unwrap();

    let spec = load_spec(&pool, build_id).await;
    assert_eq!(spec.summary.total, 2);
    assert_eq!(spec.summary.failed, 1);
}

#[actix_rt::test]
async fn test_unknown_status_is_running() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, None).await;
    let locks = SpecLocks::new(Duration::from_secs(5));

    let outcome = merge(&pool, &locks, build_id, SPEC, incoming("Login", "chrome", 1, "timedOut"))
        .await
        .unwrap();

    assert_eq!(outcome.status, CanonicalStatus::Running);
    let spec = load_spec(&pool, build_id).await;
    assert_eq!(spec.summary.running, 1);
    assert_eq!(spec.summary.finished, 0);
}

#[actix_rt::test]
async fn test_unknown_build_is_not_found() {
    let pool = create_test_pool().await;
    let locks = SpecLocks::new(Duration::from_secs(5));

    let result = merge(&pool, &locks, 9999, SPEC, incoming("Login", "chrome", 1, "passed")).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(locks.active_keys(), 0);
}

#[actix_rt::test]
async fn test_framework_mismatch_leaves_aggregate_untouched() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, None).await;
    let locks = SpecLocks::new(Duration::from_secs(5));

    let request = SubmitResultRequest {
        build_id: Some(build_id),
        spec_file: Some(SPEC.to_string()),
        test_entry: Some(TestResultInput {
            title: Some("Login".into()),
            project: Some("chromium".into()),
            ..Default::default()
        }),
    }
    .validate(Some(Framework::Playwright))
    .unwrap();

    let result = merge_test_result(&pool, &locks, Duration::from_secs(5), request).await;

    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert!(pool.find_spec_result(build_id, SPEC).await.unwrap().is_none());
}

/// Deleting a project removes its builds and their spec aggregates.
#[actix_rt::test]
async fn test_project_delete_cascades() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, None).await;
    let locks = SpecLocks::new(Duration::from_secs(5));

    merge(&pool, &locks, build_id, SPEC, incoming("Login", "chrome", 1, "passed"))
        .await
        .unwrap();

    project::Entity::delete_by_id(project.id)
        .exec(pool.connection())
        .await
        .unwrap();

    assert!(pool.get_build_by_id(build_id).await.unwrap().is_none());
    assert!(pool.get_spec_results_by_build_id(build_id).await.unwrap().is_empty());
}

/// A merge that cannot get the spec lock in time writes nothing.
#[actix_rt::test]
async fn test_lock_wait_timeout_leaves_aggregate_untouched() {
    let (pool, _dir) = create_file_pool(4).await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, None).await;
    let locks = SpecLocks::new(Duration::from_millis(50));

    merge(&pool, &locks, build_id, SPEC, incoming("Login", "chrome", 1, "running"))
        .await
        .unwrap();

    let held = locks.acquire(&spec_lock_key(build_id, SPEC)).await.unwrap();
    let result = merge(&pool, &locks, build_id, SPEC, incoming("Login", "chrome", 1, "passed")).await;
    drop(held);

    assert!(matches!(result, Err(AppError::LockTimeout(_))));
    let spec = load_spec(&pool, build_id).await;
    assert_eq!(spec.tests.len(), 1);
    assert_eq!(spec.tests[0].status, CanonicalStatus::Running);
    assert_eq!(locks.active_keys(), 0);
}

/// However short the merge timeout, a timed-out merge is never visible afterwards.
#[actix_rt::test]
async fn test_merge_timeout_never_reports_a_committed_write() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, None).await;
    let locks = SpecLocks::new(Duration::from_secs(5));

    let mut seed = incoming("Login", "chrome", 1, "running");
    seed.logs = vec!["start".into()];
    merge(&pool, &locks, build_id, SPEC, seed).await.unwrap();

    let mut committed = 1;
    for i in 0..40u64 {
        let mut test = incoming("Login", "chrome", 1, "running");
        test.logs = vec![format!("line {}", i)];
        let request = merge_request(build_id, SPEC, test);

        let result = merge_test_result(&pool, &locks, Duration::from_micros(i * 25), request).await;
        let logs = load_spec(&pool, build_id).await.tests[0].logs.clone();

        match result {
            Ok(_) => {
                committed += 1;
                assert_eq!(logs.last().map(String::as_str), Some(format!("line {}", i).as_str()));
            }
            Err(AppError::Timeout(_)) => {
                assert!(!logs.contains(&format!("line {}", i)));
            }
            Err(other) => panic!("unexpected merge error: {:?}", other),
        }
        assert_eq!(logs.len(), committed);
    }
    assert_eq!(locks.active_keys(), 0);
}

/// Dropping the transaction after the upsert discards the staged merge.
#[actix_rt::test]
async fn test_uncommitted_merge_rolls_back() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, None).await;
    let locks = SpecLocks::new(Duration::from_secs(5));

    merge(&pool, &locks, build_id, SPEC, incoming("Login", "chrome", 1, "failed"))
        .await
        .unwrap();

    let txn = pool.connection().begin().await.unwrap();
    let request = merge_request(build_id, SPEC, incoming("Login", "chrome", 2, "passed"));
    let outcome = stage_merge(&txn, &request).await.unwrap();
    assert_eq!(outcome.test_count, 2);

    let staged = find_spec_result_for_update(&txn, build_id, SPEC)
        .await
        .unwrap()
        .expect("row exists inside the transaction");
    assert_eq!(staged.tests.as_array().map(Vec::len), Some(2));
    drop(txn);

    let spec = load_spec(&pool, build_id).await;
    assert_eq!(spec.tests.len(), 1);
    assert_eq!(spec.tests[0].status, CanonicalStatus::Failed);
}

/// The placeholder row is created once and never overwrites stored tests.
#[actix_rt::test]
async fn test_ensure_spec_result_is_idempotent() {
    let pool = create_test_pool().await;
    let project = seed_project(&pool).await;
    let build_id = seed_build(&pool, &project, None).await;
    let now = chrono::Utc::now();

    ensure_spec_result(pool.connection(), build_id, SPEC, now).await.unwrap();
    ensure_spec_result(pool.connection(), build_id, SPEC, now).await.unwrap();

    let rows = pool.get_spec_results_by_build_id(build_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tests, serde_json::json!([]));

    let locks = SpecLocks::new(Duration::from_secs(5));
    merge(&pool, &locks, build_id, SPEC, incoming("Login", "chrome", 1, "passed"))
        .await
        .unwrap();
    ensure_spec_result(pool.connection(), build_id, SPEC, now).await.unwrap();

    assert_eq!(load_spec(&pool, build_id).await.tests.len(), 1);
}
