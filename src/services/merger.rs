//! Result merger.
//!
//! Folds one finished-test event into its `(build_id, spec_file)` aggregate.
//! The whole read-modify-write runs under the per-spec lock and inside one
//! storage transaction. Any error before commit, including the merge
//! timeout, drops the transaction so it rolls back and the aggregate is
//! left as it was.

use std::time::Duration;

use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseTransaction, TransactionTrait};
use tracing::{debug, info};

use crate::db::DbPool;
use crate::db::builds::find_build;
use crate::db::spec_results::{
    ensure_spec_result, find_spec_result_for_update, upsert_spec_result,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    CanonicalStatus, Framework, IncomingTest, MergeKind, SubmitResultRequest, merge_entry,
    parse_tests,
};
use crate::services::spec_lock::{SpecLocks, spec_lock_key};

/// A validated merge request.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub build_id: i32,
    pub spec_file: String,
    pub test: IncomingTest,
    /// When set, the build must have been registered for this framework
    pub framework: Option<Framework>,
}

/// What a merge left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub build_id: i32,
    pub spec_file: String,
    pub test_count: usize,
    pub kind: MergeKind,
    pub title: String,
    pub project: String,
    pub run_number: i32,
    pub status: CanonicalStatus,
}

impl SubmitResultRequest {
    /// Check required fields and normalize the test entry.
    pub fn validate(self, framework: Option<Framework>) -> AppResult<MergeRequest> {
        let build_id = self
            .build_id
            .ok_or_else(|| AppError::InvalidInput("build_id is required".to_string()))?;

        let spec_file = self
            .spec_file
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::InvalidInput("spec_file is required".to_string()))?;

        let test = self
            .test_entry
            .ok_or_else(|| AppError::InvalidInput("test_entry is required".to_string()))?
            .validate()?;

        Ok(MergeRequest {
            build_id,
            spec_file,
            test,
            framework,
        })
    }
}

/// Merge one test result into its spec aggregate.
///
/// The merge timeout bounds begin, load, merge and upsert. COMMIT is sent
/// only after those finish and is always awaited, so `AppError::Timeout`
/// means nothing was written.
pub async fn merge_test_result(
    pool: &DbPool,
    locks: &SpecLocks,
    merge_timeout: Duration,
    request: MergeRequest,
) -> AppResult<MergeOutcome> {
    let key = spec_lock_key(request.build_id, &request.spec_file);
    let request = &request;

    let outcome = locks
        .with_lock(&key, move || async move {
            let staged = tokio::time::timeout(merge_timeout, begin_and_stage(pool, request)).await;
            let (txn, outcome) = match staged {
                Ok(result) => result?,
                Err(_) => return Err(AppError::Timeout(merge_timeout.as_millis())),
            };

            txn.commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to commit merge: {}", e)))?;
            Ok(outcome)
        })
        .await?;

    info!(
        build_id = outcome.build_id,
        spec_file = %outcome.spec_file,
        test_count = outcome.test_count,
        appended = outcome.kind == MergeKind::Appended,
        status = %outcome.status,
        "Test result merged"
    );

    Ok(outcome)
}

async fn begin_and_stage(
    pool: &DbPool,
    request: &MergeRequest,
) -> AppResult<(DatabaseTransaction, MergeOutcome)> {
    let txn = pool
        .connection()
        .begin()
        .await
        .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

    let outcome = stage_merge(&txn, request).await?;
    Ok((txn, outcome))
}

/// Apply one merge inside an open transaction without committing it.
///
/// Dropping the transaction afterwards discards every write made here.
pub async fn stage_merge<C: ConnectionTrait>(
    db: &C,
    request: &MergeRequest,
) -> AppResult<MergeOutcome> {
    let build = find_build(db, request.build_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Build {}", request.build_id)))?;

    if let Some(expected) = request.framework
        && Framework::parse(&build.build_type) != Some(expected)
    {
        return Err(AppError::InvalidInput(format!(
            "Build {} is a {} build, not {}",
            build.id, build.build_type, expected
        )));
    }

    let now = Utc::now();
    ensure_spec_result(db, build.id, &request.spec_file, now).await?;

    let existing = find_spec_result_for_update(db, build.id, &request.spec_file)
        .await?
        .ok_or_else(|| {
            AppError::Database(format!(
                "Spec result row for build {} / {} vanished inside the transaction",
                build.id, request.spec_file
            ))
        })?;

    let mut tests = parse_tests(&existing.tests)?;
    if tests.is_empty() {
        debug!(build_id = build.id, spec_file = %request.spec_file, "First result for spec");
    }

    let kind = merge_entry(&mut tests, request.test.clone(), now);
    let test_count = tests.len();

    let stored = serde_json::to_value(&tests)
        .map_err(|e| AppError::Database(format!("Failed to encode test array: {}", e)))?;
    upsert_spec_result(db, build.id, &request.spec_file, stored, now).await?;

    Ok(MergeOutcome {
        build_id: build.id,
        spec_file: request.spec_file.clone(),
        test_count,
        kind,
        title: request.test.title.clone(),
        project: request.test.project.clone(),
        run_number: request.test.run_number,
        status: request.test.status,
    })
}
