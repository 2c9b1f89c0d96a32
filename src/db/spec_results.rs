//! Aggregate store: one row per (build_id, spec_file) holding the test array.
//!
//! Reads are plain lookups. The transaction-scoped helpers are the only
//! writers and are called by the result merger under the per-spec lock.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DbErr, EntityTrait, NotSet, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;

use crate::entity::spec_result::{self, ActiveModel, Entity as SpecResult};
use crate::error::{AppError, AppResult};

use super::DbPool;

impl DbPool {
    /// Get a spec aggregate by its ID.
    pub async fn get_spec_result_by_id(&self, id: i32) -> AppResult<Option<spec_result::Model>> {
        SpecResult::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get spec result: {}", e)))
    }

    /// Get the aggregate for one spec file of a build.
    pub async fn find_spec_result(
        &self,
        build_id: i32,
        spec_file: &str,
    ) -> AppResult<Option<spec_result::Model>> {
        SpecResult::find()
            .filter(spec_result::Column::BuildId.eq(build_id))
            .filter(spec_result::Column::SpecFile.eq(spec_file))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to find spec result: {}", e)))
    }

    /// All aggregates of a build, ordered by spec file.
    pub async fn get_spec_results_by_build_id(
        &self,
        build_id: i32,
    ) -> AppResult<Vec<spec_result::Model>> {
        SpecResult::find()
            .filter(spec_result::Column::BuildId.eq(build_id))
            .order_by_asc(spec_result::Column::SpecFile)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get spec results: {}", e)))
    }
}

/// Make sure the aggregate row exists, with an empty test array when new.
///
/// Run before [`find_spec_result_for_update`] so the row lock always has a
/// row to take. A concurrent first insert from another replica blocks on the
/// unique index until that transaction ends, then becomes a no-op.
pub async fn ensure_spec_result<C: ConnectionTrait>(
    db: &C,
    build_id: i32,
    spec_file: &str,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let model = ActiveModel {
        id: NotSet,
        build_id: Set(build_id),
        spec_file: Set(spec_file.to_string()),
        tests: Set(JsonValue::Array(Vec::new())),
        executed_at: Set(now),
        created_at: Set(now),
    };

    let result = SpecResult::insert(model)
        .on_conflict(
            OnConflict::columns([spec_result::Column::BuildId, spec_result::Column::SpecFile])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(AppError::Database(format!(
            "Failed to create spec result row: {}",
            e
        ))),
    }
}

/// Load the aggregate inside a transaction, row-locked on PostgreSQL.
///
/// The row lock serializes merges across server replicas, where the
/// in-process spec lock does not reach. SQLite takes no row locks; its
/// single writer serializes instead.
pub async fn find_spec_result_for_update<C: ConnectionTrait>(
    db: &C,
    build_id: i32,
    spec_file: &str,
) -> AppResult<Option<spec_result::Model>> {
    let mut select = SpecResult::find()
        .filter(spec_result::Column::BuildId.eq(build_id))
        .filter(spec_result::Column::SpecFile.eq(spec_file));

    if db.get_database_backend() == DatabaseBackend::Postgres {
        select = select.lock_exclusive();
    }

    select
        .one(db)
        .await
        .map_err(|e| AppError::Database(format!("Failed to load spec result: {}", e)))
}

/// Write the full test array, inserting the row or updating it on a
/// (build_id, spec_file) conflict.
pub async fn upsert_spec_result<C: ConnectionTrait>(
    db: &C,
    build_id: i32,
    spec_file: &str,
    tests: JsonValue,
    executed_at: DateTime<Utc>,
) -> AppResult<()> {
    let model = ActiveModel {
        id: NotSet,
        build_id: Set(build_id),
        spec_file: Set(spec_file.to_string()),
        tests: Set(tests),
        executed_at: Set(executed_at),
        created_at: Set(executed_at),
    };

    let result = SpecResult::insert(model)
        .on_conflict(
            OnConflict::columns([spec_result::Column::BuildId, spec_result::Column::SpecFile])
                .update_columns([spec_result::Column::Tests, spec_result::Column::ExecutedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(DbErr::RecordNotInserted) => Err(AppError::Database(format!(
            "Spec result for build {} / {} was not written",
            build_id, spec_file
        ))),
        Err(e) => Err(AppError::Database(format!(
            "Failed to upsert spec result: {}",
            e
        ))),
    }
}
