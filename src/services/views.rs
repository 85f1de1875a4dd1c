//! Response shapes shared by the services and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[cfg(feature = "server")]
use utoipa::ToSchema;

use crate::database::entities::extensions::ExtensionStatus;
use crate::database::entities::{devices, extensions, interfaces, lines, object_changes, partitions};

use super::tags;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct NestedPartition {
    pub id: i32,
    pub name: String,
    pub enforce_unique: bool,
}

impl From<&partitions::Model> for NestedPartition {
    fn from(model: &partitions::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            enforce_unique: model.enforce_unique,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct NestedDevice {
    pub id: i32,
    pub name: String,
}

impl From<&devices::Model> for NestedDevice {
    fn from(model: &devices::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
        }
    }
}

/// The line or interface an extension is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParentView {
    Line {
        id: i32,
        name: String,
        device: Option<NestedDevice>,
    },
    Interface {
        id: i32,
        name: String,
        device: Option<NestedDevice>,
    },
}

impl ParentView {
    pub fn device(&self) -> Option<&NestedDevice> {
        match self {
            ParentView::Line { device, .. } | ParentView::Interface { device, .. } => {
                device.as_ref()
            }
        }
    }

    pub fn from_line(line: &lines::Model, device: Option<&devices::Model>) -> Self {
        ParentView::Line {
            id: line.id,
            name: line.name.clone(),
            device: device.map(NestedDevice::from),
        }
    }

    pub fn from_interface(interface: &interfaces::Model, device: Option<&devices::Model>) -> Self {
        ParentView::Interface {
            id: interface.id,
            name: interface.name.clone(),
            device: device.map(NestedDevice::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct ExtensionView {
    pub id: i32,
    pub dn: String,
    pub partition: Option<NestedPartition>,
    pub status: ExtensionStatus,
    pub status_label: String,
    pub status_class: String,
    pub parent: Option<ParentView>,
    /// Device of the parent line or interface
    pub device: Option<NestedDevice>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExtensionView {
    pub fn new(
        model: &extensions::Model,
        partition: Option<&partitions::Model>,
        parent: Option<ParentView>,
    ) -> Self {
        Self {
            id: model.id,
            dn: model.dn.clone(),
            partition: partition.map(NestedPartition::from),
            status: model.status,
            status_label: model.status.label().to_string(),
            status_class: model.status.css_class().to_string(),
            device: parent.as_ref().and_then(ParentView::device).cloned(),
            parent,
            description: model.description.clone(),
            tags: tags::decode(&model.tags),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct NestedExtension {
    pub id: i32,
    pub dn: String,
    pub partition: Option<NestedPartition>,
    pub status: ExtensionStatus,
}

impl NestedExtension {
    pub fn new(model: &extensions::Model, partition: Option<&partitions::Model>) -> Self {
        Self {
            id: model.id,
            dn: model.dn.clone(),
            partition: partition.map(NestedPartition::from),
            status: model.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct PartitionView {
    pub id: i32,
    pub name: String,
    pub enforce_unique: bool,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub extension_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PartitionView {
    pub fn new(model: &partitions::Model, extension_count: u64) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            enforce_unique: model.enforce_unique,
            description: model.description.clone(),
            tags: tags::decode(&model.tags),
            extension_count,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct LineView {
    pub id: i32,
    pub device: Option<NestedDevice>,
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Extensions whose parent is this line
    pub extensions: Vec<NestedExtension>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LineView {
    pub fn new(
        model: &lines::Model,
        device: Option<&devices::Model>,
        extensions: Vec<NestedExtension>,
    ) -> Self {
        Self {
            id: model.id,
            device: device.map(NestedDevice::from),
            name: model.name.clone(),
            description: model.description.clone(),
            tags: tags::decode(&model.tags),
            extensions,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct ObjectChangeView {
    pub id: i32,
    pub time: DateTime<Utc>,
    pub action: String,
    pub object_type: String,
    pub object_id: i32,
    pub object_repr: String,
    pub related_type: Option<String>,
    pub related_id: Option<i32>,
    #[cfg_attr(feature = "server", schema(value_type = Object))]
    pub object_data: serde_json::Value,
}

impl From<object_changes::Model> for ObjectChangeView {
    fn from(model: object_changes::Model) -> Self {
        Self {
            id: model.id,
            time: model.time,
            action: model.action,
            object_type: model.object_type,
            object_id: model.object_id,
            object_repr: model.object_repr,
            related_type: model.related_type,
            related_id: model.related_id,
            object_data: serde_json::from_str(&model.object_data)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Paginated list envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[cfg_attr(
    feature = "server",
    aliases(
        PartitionPage = Page<PartitionView>,
        ExtensionPage = Page<ExtensionView>,
        LinePage = Page<LineView>
    )
)]
pub struct Page<T> {
    pub count: u64,
    pub limit: u64,
    pub offset: u64,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(count: u64, limit: u64, offset: u64, results: Vec<T>) -> Self {
        Self {
            count,
            limit,
            offset,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::extensions::ExtensionStatus;

    #[test]
    fn extension_view_lifts_parent_device() {
        let now = Utc::now();
        let model = extensions::Model {
            id: 1,
            dn: "1000".to_string(),
            partition_id: None,
            status: ExtensionStatus::Inactive,
            line_id: Some(4),
            interface_id: None,
            unique_scope: None,
            description: None,
            tags: r#"["lab"]"#.to_string(),
            created_at: now,
            updated_at: now,
        };
        let device = devices::Model {
            id: 2,
            name: "phone-01".to_string(),
            created_at: now,
        };
        let line = lines::Model {
            id: 4,
            device_id: Some(2),
            name: "L1".to_string(),
            description: None,
            tags: "[]".to_string(),
            created_at: now,
            updated_at: now,
        };

        let parent = ParentView::from_line(&line, Some(&device));
        let view = ExtensionView::new(&model, None, Some(parent));
        assert_eq!(view.status_label, "Inactive");
        assert_eq!(view.status_class, "info");
        assert_eq!(view.device.as_ref().map(|d| d.name.as_str()), Some("phone-01"));
        assert_eq!(view.tags, vec!["lab"]);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["parent"]["type"], "line");
        assert_eq!(json["status"], "inactive");
    }
}
