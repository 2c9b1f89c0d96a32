//! Migration: Create spec_results table.
//!
//! One aggregate row per spec file per build. The (build_id, spec_file)
//! unique index is the conflict target of the merge upsert.

use sea_orm_migration::prelude::*;

use super::m20261001_000002_create_builds::Builds;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SpecResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SpecResults::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SpecResults::BuildId).integer().not_null())
                    .col(ColumnDef::new(SpecResults::SpecFile).string_len(1000).not_null())
                    .col(ColumnDef::new(SpecResults::Tests).json_binary().not_null())
                    .col(
                        ColumnDef::new(SpecResults::ExecutedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SpecResults::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_spec_results_build_id")
                            .from(SpecResults::Table, SpecResults::BuildId)
                            .to(Builds::Table, Builds::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_spec_results_build_spec")
                    .table(SpecResults::Table)
                    .col(SpecResults::BuildId)
                    .col(SpecResults::SpecFile)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SpecResults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SpecResults {
    Table,
    Id,
    BuildId,
    SpecFile,
    Tests,
    ExecutedAt,
    CreatedAt,
}
