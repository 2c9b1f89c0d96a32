//! Database queries for projects.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::entity::project::{self, ActiveModel, Entity as Project};
use crate::error::{AppError, AppResult};

use super::DbPool;

impl DbPool {
    /// Insert a new project.
    pub async fn insert_project(
        &self,
        name: &str,
        organization_id: Uuid,
    ) -> AppResult<project::Model> {
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            organization_id: Set(organization_id),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert project: {}", e)))
    }

    /// Get a project by ID.
    pub async fn get_project_by_id(&self, id: Uuid) -> AppResult<Option<project::Model>> {
        Project::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get project: {}", e)))
    }

    /// List all projects, newest first.
    pub async fn list_projects(&self) -> AppResult<Vec<project::Model>> {
        Project::find()
            .order_by_desc(project::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list projects: {}", e)))
    }
}
