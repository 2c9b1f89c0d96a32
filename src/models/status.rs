//! Canonical test status and the runner-status normalizer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The four outcomes every runner-reported status collapses to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Passed,
    Failed,
    Running,
    Skipped,
}

impl CanonicalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Running => "running",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the test has reached an outcome.
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map a runner-reported status onto [`CanonicalStatus`].
///
/// Case-insensitive and total. Anything unrecognized, including a missing
/// status, is `Running`: an event whose status cannot be read is never
/// recorded as a finished outcome.
pub fn normalize_status(raw: Option<&str>) -> CanonicalStatus {
    let Some(raw) = raw else {
        return CanonicalStatus::Running;
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "passed" | "success" | "expected" => CanonicalStatus::Passed,
        "failed" | "error" | "fail" => CanonicalStatus::Failed,
        "pending" | "skipped" => CanonicalStatus::Skipped,
        _ => CanonicalStatus::Running,
    }
}
