//! Spec aggregate DTOs and the read-side fold into pass/fail counts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::status::CanonicalStatus;
use super::test_entry::{TestEntry, TestResultInput, parse_tests};
use crate::entity::spec_result;
use crate::error::AppResult;

/// Request to merge one test result into its spec aggregate.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SubmitResultRequest {
    #[serde(default)]
    pub build_id: Option<i32>,
    #[serde(default)]
    pub spec_file: Option<String>,
    #[serde(default)]
    pub test_entry: Option<TestResultInput>,
}

/// Response after a merge.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitResultResponse {
    pub success: bool,
    /// Spec file the result was merged into
    pub spec: String,
    /// Entries in the spec aggregate after the merge
    pub test_count: usize,
}

/// Counts for one spec aggregate.
///
/// Each test identity counts once, by the outcome of its highest run number.
/// A test whose final run passed after an earlier failed run is also flaky.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SpecSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub running: usize,
    /// Tests whose latest run reached a final outcome
    pub finished: usize,
    pub flaky: usize,
    /// All recorded runs including retries
    pub runs: usize,
}

impl SpecSummary {
    pub fn from_tests(tests: &[TestEntry]) -> Self {
        let mut by_identity: HashMap<String, Vec<&TestEntry>> = HashMap::new();
        for test in tests {
            by_identity.entry(test.identity_key()).or_default().push(test);
        }

        let mut summary = SpecSummary {
            total: by_identity.len(),
            runs: tests.len(),
            ..Default::default()
        };

        for runs in by_identity.values() {
            let Some(latest) = runs.iter().max_by_key(|t| t.run_number) else {
                continue;
            };
            if latest.status.is_finished() {
                summary.finished += 1;
            }
            match latest.status {
                CanonicalStatus::Passed => {
                    summary.passed += 1;
                    if runs.iter().any(|t| t.status == CanonicalStatus::Failed) {
                        summary.flaky += 1;
                    }
                }
                CanonicalStatus::Failed => summary.failed += 1,
                CanonicalStatus::Skipped => summary.skipped += 1,
                CanonicalStatus::Running => summary.running += 1,
            }
        }

        summary
    }
}

/// One spec aggregate with its decoded test array.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpecResultResponse {
    pub id: i32,
    pub build_id: i32,
    pub spec_file: String,
    pub tests: Vec<TestEntry>,
    pub summary: SpecSummary,
    pub executed_at: DateTime<Utc>,
}

impl SpecResultResponse {
    pub fn from_model(m: spec_result::Model) -> AppResult<Self> {
        let tests = parse_tests(&m.tests)?;
        let summary = SpecSummary::from_tests(&tests);
        Ok(Self {
            id: m.id,
            build_id: m.build_id,
            spec_file: m.spec_file,
            tests,
            summary,
            executed_at: m.executed_at,
        })
    }
}

/// Query for looking up a single spec of a build.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SpecFileQuery {
    pub spec_file: String,
}
