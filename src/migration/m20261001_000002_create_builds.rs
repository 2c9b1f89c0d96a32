//! Migration: Create builds table.
//!
//! The unique index on (project_id, session_id) lets racing registrations for
//! one session converge on a single row. NULL session ids never collide.

use sea_orm_migration::prelude::*;

use super::m20261001_000001_create_projects::Projects;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Builds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Builds::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Builds::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(Builds::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Builds::SessionId).string_len(255))
                    .col(
                        ColumnDef::new(Builds::Environment)
                            .string_len(100)
                            .not_null()
                            .default("local"),
                    )
                    .col(
                        ColumnDef::new(Builds::Status)
                            .string_len(20)
                            .not_null()
                            .default("running"),
                    )
                    .col(
                        ColumnDef::new(Builds::Type)
                            .string_len(20)
                            .not_null()
                            .default("cypress"),
                    )
                    .col(
                        ColumnDef::new(Builds::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Builds::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_builds_project_id")
                            .from(Builds::Table, Builds::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_builds_project_session")
                    .table(Builds::Table)
                    .col(Builds::ProjectId)
                    .col(Builds::SessionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_builds_created_at")
                    .table(Builds::Table)
                    .col(Builds::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Builds::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Builds {
    Table,
    Id,
    ProjectId,
    OrganizationId,
    SessionId,
    Environment,
    Status,
    Type,
    CreatedAt,
    UpdatedAt,
}
