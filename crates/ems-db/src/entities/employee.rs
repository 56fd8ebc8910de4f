//! Employee entity for the directory and for login

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    /// Employee ID (auto-increment primary key)
    #[sea_orm(primary_key)]
    pub id: i32,

    pub first_name: String,

    pub last_name: String,

    /// Login name (unique)
    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id password hash, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub email: String,

    pub date_of_birth: String,

    pub department_id: i32,

    pub position: String,

    /// When the employee was saved
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Employee belongs to a department
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Department,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
