pub mod changelog_service;
pub mod dcim_service;
pub mod export_service;
pub mod extension_service;
pub mod filters;
pub mod import_service;
pub mod line_service;
pub mod partition_service;
pub mod tags;
pub mod uniqueness;
pub mod views;

pub use changelog_service::{ChangeAction, ChangeLogService};
pub use dcim_service::DcimService;
pub use export_service::ExportService;
pub use extension_service::{ExtensionService, ParentHint};
pub use import_service::{ImportService, ImportTarget};
pub use line_service::LineService;
pub use partition_service::PartitionService;
pub use uniqueness::{UniqueScope, UniquenessPolicy};

use serde::Deserialize;

/// Field names a bulk edit may clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum BulkNullify {
    Description,
}

/// Body of the bulk delete endpoints.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct IdList {
    pub ids: Vec<i32>,
}
