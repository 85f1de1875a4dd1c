use axum::response::Json;
use utoipa::OpenApi;

use crate::database::entities::extensions::ExtensionStatus;
use crate::database::entities::devices::Model as Device;
use crate::database::entities::interfaces::Model as Interface;
use crate::services::dcim_service::{DeviceForm, InterfaceForm};
use crate::services::extension_service::{
    AssignSearch, BulkAddFailure, BulkAddResult, ExtensionBulkAdd, ExtensionBulkEdit,
    ExtensionDefaults, ExtensionForm, LooseId, StatusChoice, StatusValue,
};
use crate::services::line_service::{LineBulkAdd, LineForm, LinePatternForm};
use crate::services::partition_service::{PartitionBulkEdit, PartitionForm};
use crate::services::views::{
    ExtensionPage, ExtensionView, LinePage, LineView, NestedDevice, NestedExtension,
    NestedPartition, ObjectChangeView, ParentView, PartitionPage, PartitionView,
};
use crate::services::{BulkNullify, IdList};

use super::handlers::extensions::{AssignCandidate, AssignField, AssignForm, AssignResults};
use super::handlers::{self, DeletedCount};

#[derive(OpenApi)]
#[openapi(
    info(title = "IP phone numbering API"),
    paths(
        handlers::health::health_check,
        handlers::partitions::list_partitions,
        handlers::partitions::create_partition,
        handlers::partitions::get_partition,
        handlers::partitions::update_partition,
        handlers::partitions::delete_partition,
        handlers::partitions::import_partitions,
        handlers::partitions::bulk_edit_partitions,
        handlers::partitions::bulk_delete_partitions,
        handlers::partitions::partition_changelog,
        handlers::extensions::list_extensions,
        handlers::extensions::create_extension,
        handlers::extensions::add_extension_form,
        handlers::extensions::assign_form,
        handlers::extensions::assign_search,
        handlers::extensions::bulk_add_extensions,
        handlers::extensions::import_extensions,
        handlers::extensions::export_extensions,
        handlers::extensions::bulk_edit_extensions,
        handlers::extensions::bulk_delete_extensions,
        handlers::extensions::get_extension,
        handlers::extensions::update_extension,
        handlers::extensions::delete_extension,
        handlers::extensions::extension_changelog,
        handlers::lines::list_lines,
        handlers::lines::create_line,
        handlers::lines::get_line,
        handlers::lines::update_line,
        handlers::lines::delete_line,
        handlers::lines::import_lines,
        handlers::lines::bulk_add_lines,
        handlers::lines::line_changelog,
        handlers::devices::list_devices,
        handlers::devices::create_device,
        handlers::devices::get_device,
        handlers::devices::delete_device,
        handlers::devices::list_device_lines,
        handlers::devices::create_device_lines,
        handlers::devices::bulk_delete_device_lines,
        handlers::devices::list_interfaces,
        handlers::devices::create_interface,
        handlers::devices::delete_interface,
    ),
    components(schemas(
        PartitionForm,
        PartitionBulkEdit,
        PartitionView,
        PartitionPage,
        ExtensionForm,
        ExtensionBulkEdit,
        ExtensionBulkAdd,
        ExtensionDefaults,
        ExtensionView,
        ExtensionPage,
        ExtensionStatus,
        StatusValue,
        StatusChoice,
        LooseId,
        BulkAddResult,
        BulkAddFailure,
        AssignSearch,
        AssignForm,
        AssignField,
        AssignCandidate,
        AssignResults,
        LineForm,
        LinePatternForm,
        LineBulkAdd,
        LineView,
        LinePage,
        DeviceForm,
        InterfaceForm,
        Device,
        Interface,
        NestedPartition,
        NestedDevice,
        NestedExtension,
        ParentView,
        ObjectChangeView,
        BulkNullify,
        IdList,
        DeletedCount,
    )),
    tags(
        (name = "partitions", description = "Numbering partitions"),
        (name = "extensions", description = "Directory numbers"),
        (name = "lines", description = "Phone lines on devices"),
        (name = "devices", description = "Devices and interfaces"),
        (name = "health", description = "Service status")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
