use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Style classes keyed by small integers, shared by every status-like label.
pub const STATUS_CHOICE_CLASSES: [&str; 6] = [
    "default", "primary", "info", "danger", "warning", "success",
];

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "lowercase")]
pub enum ExtensionStatus {
    #[sea_orm(num_value = 1)]
    Active,
    #[sea_orm(num_value = 2)]
    Inactive,
}

impl Default for ExtensionStatus {
    fn default() -> Self {
        ExtensionStatus::Active
    }
}

impl ExtensionStatus {
    pub fn value(self) -> i32 {
        match self {
            ExtensionStatus::Active => 1,
            ExtensionStatus::Inactive => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExtensionStatus::Active => "Active",
            ExtensionStatus::Inactive => "Inactive",
        }
    }

    pub fn css_class(self) -> &'static str {
        // The status value doubles as the index into the class table.
        STATUS_CHOICE_CLASSES[self.value() as usize]
    }
}

impl fmt::Display for ExtensionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExtensionStatus {
    type Err = String;

    /// Accepts the label ("Active"), the API name ("active") or the numeric value ("1").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" | "1" => Ok(ExtensionStatus::Active),
            "inactive" | "2" => Ok(ExtensionStatus::Inactive),
            other => Err(other.to_string()),
        }
    }
}

/// The single parent an extension may hang off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParentLink {
    Line(i32),
    Interface(i32),
}

impl ParentLink {
    /// Split into the (line_id, interface_id) column pair.
    pub fn into_columns(link: Option<ParentLink>) -> (Option<i32>, Option<i32>) {
        match link {
            Some(ParentLink::Line(id)) => (Some(id), None),
            Some(ParentLink::Interface(id)) => (None, Some(id)),
            None => (None, None),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParentLink::Line(_) => "line",
            ParentLink::Interface(_) => "interface",
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            ParentLink::Line(id) | ParentLink::Interface(id) => *id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "extensions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub dn: String,
    pub partition_id: Option<i32>,
    pub status: ExtensionStatus,
    pub line_id: Option<i32>,
    pub interface_id: Option<i32>,
    /// `partition:<id>`, `global` or NULL; see `services::uniqueness`
    pub unique_scope: Option<String>,
    pub description: Option<String>,
    pub tags: String, // JSON array stored as string
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::partitions::Entity",
        from = "Column::PartitionId",
        to = "super::partitions::Column::Id",
        on_delete = "Restrict"
    )]
    Partitions,
    #[sea_orm(
        belongs_to = "super::lines::Entity",
        from = "Column::LineId",
        to = "super::lines::Column::Id",
        on_delete = "SetNull"
    )]
    Lines,
    #[sea_orm(
        belongs_to = "super::interfaces::Entity",
        from = "Column::InterfaceId",
        to = "super::interfaces::Column::Id",
        on_delete = "SetNull"
    )]
    Interfaces,
}

impl Related<super::partitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Partitions.def()
    }
}

impl Related<super::lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::interfaces::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Interfaces.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn parent(&self) -> Option<ParentLink> {
        match (self.line_id, self.interface_id) {
            (Some(line_id), _) => Some(ParentLink::Line(line_id)),
            (None, Some(interface_id)) => Some(ParentLink::Interface(interface_id)),
            (None, None) => None,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_and_classes() {
        assert_eq!(ExtensionStatus::Active.label(), "Active");
        assert_eq!(ExtensionStatus::Active.css_class(), "primary");
        assert_eq!(ExtensionStatus::Inactive.css_class(), "info");
        assert_eq!(ExtensionStatus::default(), ExtensionStatus::Active);
    }

    #[test]
    fn status_parses_labels_names_and_values() {
        assert_eq!("Active".parse(), Ok(ExtensionStatus::Active));
        assert_eq!(" inactive ".parse(), Ok(ExtensionStatus::Inactive));
        assert_eq!("2".parse(), Ok(ExtensionStatus::Inactive));
        assert!("retired".parse::<ExtensionStatus>().is_err());
    }

    #[test]
    fn parent_link_columns() {
        assert_eq!(
            ParentLink::into_columns(Some(ParentLink::Line(3))),
            (Some(3), None)
        );
        assert_eq!(
            ParentLink::into_columns(Some(ParentLink::Interface(8))),
            (None, Some(8))
        );
        assert_eq!(ParentLink::into_columns(None), (None, None));
    }
}
