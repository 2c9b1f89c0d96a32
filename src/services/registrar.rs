//! Build registrar.
//!
//! Workers of one CI session all call registration; they must converge on a
//! single build. With a session id the insert is an insert-or-nothing on
//! (project_id, session_id) followed by a read of the running build, so every
//! racing caller resolves the same id. Without a session id every call
//! creates a fresh build.

use tracing::info;

use crate::db::DbPool;
use crate::entity::build;
use crate::error::{AppError, AppResult};
use crate::models::{DEFAULT_ENVIRONMENT, Framework, NewBuild, RegisterBuildRequest};

/// Result of a registration call.
#[derive(Debug, Clone)]
pub struct Registration {
    pub build: build::Model,
    /// False when an existing session build was reused
    pub created: bool,
}

impl RegisterBuildRequest {
    /// Check the request and fill defaults.
    pub fn validate(self) -> AppResult<NewBuild> {
        let project_id = self
            .project_id
            .ok_or_else(|| AppError::InvalidInput("project_id is required".to_string()))?;

        let framework = match self.build_type.as_deref().map(str::trim) {
            None | Some("") => Framework::default(),
            Some(raw) => Framework::parse(raw).ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "type must be 'cypress' or 'playwright', got '{}'",
                    raw
                ))
            })?,
        };

        let environment = self
            .environment
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let session_id = self
            .session_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(NewBuild {
            project_id,
            session_id,
            environment,
            framework,
        })
    }
}

/// Create the build for a session, or find the one a parallel worker created.
pub async fn register_build(pool: &DbPool, new: NewBuild) -> AppResult<Registration> {
    let project = pool
        .get_project_by_id(new.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {}", new.project_id)))?;

    let registration = match new.session_id.as_deref() {
        Some(session_id) => {
            let created = pool.upsert_session_build(&project, &new).await?;
            let build = pool
                .find_running_build_by_session(project.id, session_id)
                .await?
                .ok_or_else(|| {
                    AppError::InvalidInput(format!(
                        "Session {} of project {} is already finalized",
                        session_id, project.id
                    ))
                })?;
            Registration { build, created }
        }
        None => Registration {
            build: pool.insert_build(&project, &new).await?,
            created: true,
        },
    };

    info!(
        build_id = registration.build.id,
        project_id = %project.id,
        session_id = ?new.session_id,
        framework = %new.framework,
        created = registration.created,
        "Build registered"
    );

    Ok(registration)
}
