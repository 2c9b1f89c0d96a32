//! Database queries for builds.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::build::{self, ActiveModel, Entity as Build};
use crate::entity::project;
use crate::error::{AppError, AppResult};
use crate::models::{BuildStatus, NewBuild};

use super::DbPool;

fn new_build_model(project: &project::Model, new: &NewBuild) -> ActiveModel {
    let now = Utc::now();
    ActiveModel {
        id: NotSet,
        project_id: Set(project.id),
        organization_id: Set(project.organization_id),
        session_id: Set(new.session_id.clone()),
        environment: Set(new.environment.clone()),
        status: Set(BuildStatus::Running.as_str().to_string()),
        build_type: Set(new.framework.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Get a build by ID on any connection or transaction.
pub async fn find_build<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<Option<build::Model>> {
    Build::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get build: {}", e)))
}

impl DbPool {
    /// Insert a build unconditionally. Used when no session id is supplied.
    pub async fn insert_build(
        &self,
        project: &project::Model,
        new: &NewBuild,
    ) -> AppResult<build::Model> {
        new_build_model(project, new)
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert build: {}", e)))
    }

    /// Insert a session build, or do nothing if (project_id, session_id) already exists.
    ///
    /// Returns whether this call created the row. The statement does not
    /// report the id of a pre-existing row; read it back with
    /// [`DbPool::find_running_build_by_session`].
    pub async fn upsert_session_build(
        &self,
        project: &project::Model,
        new: &NewBuild,
    ) -> AppResult<bool> {
        let result = Build::insert(new_build_model(project, new))
            .on_conflict(
                OnConflict::columns([build::Column::ProjectId, build::Column::SessionId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.connection())
            .await;

        match result {
            Ok(rows) => Ok(rows > 0),
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) => Err(AppError::Database(format!(
                "Failed to upsert session build: {}",
                e
            ))),
        }
    }

    /// Find the running build for a session.
    pub async fn find_running_build_by_session(
        &self,
        project_id: Uuid,
        session_id: &str,
    ) -> AppResult<Option<build::Model>> {
        Build::find()
            .filter(build::Column::ProjectId.eq(project_id))
            .filter(build::Column::SessionId.eq(session_id))
            .filter(build::Column::Status.eq(BuildStatus::Running.as_str()))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to find session build: {}", e)))
    }

    /// Get a build by ID.
    pub async fn get_build_by_id(&self, id: i32) -> AppResult<Option<build::Model>> {
        find_build(self.connection(), id).await
    }

    /// All builds of a project, newest first.
    pub async fn list_builds_for_project(&self, project_id: Uuid) -> AppResult<Vec<build::Model>> {
        Build::find()
            .filter(build::Column::ProjectId.eq(project_id))
            .order_by_desc(build::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list builds: {}", e)))
    }
}
