use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "object_changes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub time: ChronoDateTimeUtc,
    pub action: String, // "create", "update" or "delete"
    pub object_type: String,
    pub object_id: i32,
    pub object_repr: String,
    pub related_type: Option<String>,
    pub related_id: Option<i32>,
    pub object_data: String, // JSON snapshot
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
