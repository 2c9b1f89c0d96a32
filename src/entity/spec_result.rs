//! Spec result aggregate entity for SeaORM.
//!
//! One row per (build_id, spec_file); `tests` holds the JSON array of test entries.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "spec_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub build_id: i32,
    pub spec_file: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub tests: JsonValue,
    pub executed_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::build::Entity",
        from = "Column::BuildId",
        to = "super::build::Column::Id",
        on_delete = "Cascade"
    )]
    Build,
}

impl Related<super::build::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Build.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
