use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A physical line/port. The extensions assigned to a line are found by
/// querying `extensions.line_id`; the line itself stores no back-reference.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub device_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub tags: String, // JSON array stored as string
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::devices::Entity",
        from = "Column::DeviceId",
        to = "super::devices::Column::Id",
        on_delete = "Cascade"
    )]
    Devices,
    #[sea_orm(has_many = "super::extensions::Entity")]
    Extensions,
}

impl Related<super::devices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Devices.def()
    }
}

impl Related<super::extensions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Extensions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
