//! Build entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "builds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: Uuid,
    pub organization_id: Uuid,
    /// Externally supplied session id; unique per project when present
    pub session_id: Option<String>,
    pub environment: String,
    /// running, passed, failed
    pub status: String,
    /// cypress, playwright
    #[sea_orm(column_name = "type")]
    pub build_type: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
    #[sea_orm(has_many = "super::spec_result::Entity")]
    SpecResults,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::spec_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SpecResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
