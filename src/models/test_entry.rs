//! Test entries stored inside a spec aggregate, and the merge rules for them.
//!
//! An entry is identified by `"{project}::{title}"` plus its run number. A
//! report for a known identity updates that entry in place; a report for an
//! unknown identity (first attempt or a new retry) is appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use super::ansi::strip_ansi;
use super::status::{CanonicalStatus, normalize_status};
use crate::error::{AppError, AppResult};

/// Run number assumed when the runner does not send one.
pub const DEFAULT_RUN_NUMBER: i32 = 1;

/// Derive the identity key shared by every run of one test in one project.
pub fn unique_key(project: &str, title: &str) -> String {
    format!("{}::{}", project, title)
}

/// Error reported for a failed test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TestError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl TestError {
    /// Copy with ANSI escapes removed from message and stack.
    pub fn sanitized(&self) -> Self {
        Self {
            message: strip_ansi(&self.message),
            stack: self.stack.as_deref().map(strip_ansi),
        }
    }
}

/// One recorded execution of one test, in one project, for one run number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TestEntry {
    pub title: String,
    pub project: String,
    pub unique_key: String,
    pub run_number: i32,
    pub status: CanonicalStatus,
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TestError>,
    /// Append-only across updates
    #[serde(default)]
    pub logs: Vec<String>,
    /// Sticky: never cleared by an update that omits it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<JsonValue>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestEntry {
    pub fn identity_key(&self) -> String {
        unique_key(&self.project, &self.title)
    }

    fn same_identity(&self, key: &str, run_number: i32) -> bool {
        self.run_number == run_number && self.identity_key() == key
    }
}

/// Test entry as sent by a runner. Every field is optional on the wire so
/// that missing fields surface as validation errors, not parse errors.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TestResultInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub run_number: Option<i32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub error: Option<TestError>,
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<JsonValue>>,
}

/// A validated, normalized test report ready to merge.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingTest {
    pub title: String,
    pub project: String,
    pub run_number: i32,
    pub status: CanonicalStatus,
    pub duration_ms: i64,
    pub error: Option<TestError>,
    pub logs: Vec<String>,
    pub video_url: Option<String>,
    pub steps: Option<Vec<JsonValue>>,
}

impl IncomingTest {
    pub fn unique_key(&self) -> String {
        unique_key(&self.project, &self.title)
    }
}

impl TestResultInput {
    /// Check required fields, normalize the status and strip ANSI from errors.
    pub fn validate(self) -> AppResult<IncomingTest> {
        let title = required(self.title, "test_entry.title")?;
        let project = required(self.project, "test_entry.project")?;

        Ok(IncomingTest {
            title,
            project,
            run_number: self.run_number.unwrap_or(DEFAULT_RUN_NUMBER),
            status: normalize_status(self.status.as_deref()),
            duration_ms: self.duration_ms.unwrap_or(0).max(0),
            error: self.error.map(|e| e.sanitized()),
            logs: self.logs.unwrap_or_default(),
            video_url: self.video_url.filter(|url| !url.trim().is_empty()),
            steps: self.steps,
        })
    }
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::InvalidInput(format!("{} is required", field))),
    }
}

/// What a merge did to the test array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// An entry with the same identity and run number was updated
    Updated,
    /// A new entry was appended
    Appended,
}

/// Merge one incoming report into a spec's test array.
///
/// Logs concatenate, the video URL is kept when the update carries none,
/// every other field takes the incoming value.
pub fn merge_entry(
    tests: &mut Vec<TestEntry>,
    incoming: IncomingTest,
    now: DateTime<Utc>,
) -> MergeKind {
    let key = incoming.unique_key();

    if let Some(existing) = tests
        .iter_mut()
        .find(|t| t.same_identity(&key, incoming.run_number))
    {
        existing.status = incoming.status;
        existing.duration_ms = incoming.duration_ms;
        existing.error = incoming.error;
        existing.steps = incoming.steps;
        existing.logs.extend(incoming.logs);
        if incoming.video_url.is_some() {
            existing.video_url = incoming.video_url;
        }
        existing.updated_at = now;
        return MergeKind::Updated;
    }

    tests.push(TestEntry {
        title: incoming.title,
        project: incoming.project,
        unique_key: key,
        run_number: incoming.run_number,
        status: incoming.status,
        duration_ms: incoming.duration_ms,
        error: incoming.error,
        logs: incoming.logs,
        video_url: incoming.video_url,
        steps: incoming.steps,
        created_at: now,
        updated_at: now,
    });
    MergeKind::Appended
}

/// Decode the stored JSON array; a NULL column reads as empty.
pub fn parse_tests(value: &JsonValue) -> AppResult<Vec<TestEntry>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value.clone())
        .map_err(|e| AppError::Database(format!("Stored test array is unreadable: {}", e)))
}
