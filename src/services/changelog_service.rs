use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tracing::warn;

use crate::database::entities::object_changes;

use super::views::ObjectChangeView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        }
    }
}

/// The object a change is recorded against.
#[derive(Debug, Clone, Copy)]
pub struct ChangedObject<'a> {
    pub object_type: &'static str,
    pub id: i32,
    pub repr: &'a str,
    /// Parent object, e.g. the line an extension hangs off
    pub related: Option<(&'static str, i32)>,
}

/// Append-only change log. Writes go through the caller's connection so a
/// change is recorded in the same transaction as the edit it describes.
#[derive(Clone)]
pub struct ChangeLogService {
    db: DatabaseConnection,
}

impl ChangeLogService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn record<C, T>(
        conn: &C,
        action: ChangeAction,
        object: ChangedObject<'_>,
        snapshot: &T,
    ) -> Result<object_changes::Model, DbErr>
    where
        C: ConnectionTrait,
        T: Serialize,
    {
        let object_data = serde_json::to_string(snapshot).unwrap_or_else(|err| {
            warn!(
                "Could not serialise {} {} for the change log: {}",
                object.object_type, object.id, err
            );
            "{}".to_string()
        });

        object_changes::ActiveModel {
            time: Set(Utc::now()),
            action: Set(action.as_str().to_string()),
            object_type: Set(object.object_type.to_string()),
            object_id: Set(object.id),
            object_repr: Set(object.repr.to_string()),
            related_type: Set(object.related.map(|(kind, _)| kind.to_string())),
            related_id: Set(object.related.map(|(_, id)| id)),
            object_data: Set(object_data),
            ..Default::default()
        }
        .insert(conn)
        .await
    }

    /// Newest first.
    pub async fn list_for(
        &self,
        object_type: &str,
        object_id: i32,
    ) -> Result<Vec<ObjectChangeView>, DbErr> {
        let changes = object_changes::Entity::find()
            .filter(object_changes::Column::ObjectType.eq(object_type))
            .filter(object_changes::Column::ObjectId.eq(object_id))
            .order_by_desc(object_changes::Column::Time)
            .order_by_desc(object_changes::Column::Id)
            .all(&self.db)
            .await?;

        Ok(changes.into_iter().map(ObjectChangeView::from).collect())
    }
}
