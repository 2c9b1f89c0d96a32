//! Build domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::spec_result::SpecResultResponse;
use crate::entity::build;

/// Build lifecycle status. Only `running` is written by ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Running,
    Passed,
    Failed,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Test framework that produced a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    Cypress,
    Playwright,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cypress => "cypress",
            Self::Playwright => "playwright",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cypress" => Some(Self::Cypress),
            "playwright" => Some(Self::Playwright),
            _ => None,
        }
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Default environment recorded when the runner sends none.
pub const DEFAULT_ENVIRONMENT: &str = "local";

/// Parameters of a build registration after request validation.
#[derive(Debug, Clone)]
pub struct NewBuild {
    pub project_id: Uuid,
    /// Deduplication key; `None` always creates a fresh build
    pub session_id: Option<String>,
    pub environment: String,
    pub framework: Framework,
}

/// Request to register (or rejoin) a build.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RegisterBuildRequest {
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default, rename = "type")]
    pub build_type: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response after registering a build.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBuildResponse {
    pub success: bool,
    pub build_id: i32,
    pub project_id: Uuid,
    pub organization_id: Uuid,
}

/// A registered build.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BuildResponse {
    pub id: i32,
    pub project_id: Uuid,
    pub organization_id: Uuid,
    pub session_id: Option<String>,
    pub environment: String,
    pub status: BuildStatus,
    #[serde(rename = "type")]
    pub build_type: Framework,
    pub created_at: DateTime<Utc>,
}

impl From<build::Model> for BuildResponse {
    fn from(m: build::Model) -> Self {
        Self {
            id: m.id,
            project_id: m.project_id,
            organization_id: m.organization_id,
            session_id: m.session_id,
            environment: m.environment,
            status: BuildStatus::parse(&m.status).unwrap_or(BuildStatus::Running),
            build_type: Framework::parse(&m.build_type).unwrap_or_default(),
            created_at: m.created_at,
        }
    }
}

/// A build with every spec aggregate recorded for it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BuildDetailResponse {
    pub build: BuildResponse,
    pub specs: Vec<SpecResultResponse>,
}
