use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::database::entities::devices::Model as Device;
use crate::database::entities::interfaces::Model as Interface;
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::services::dcim_service::{DeviceForm, InterfaceForm};
use crate::services::line_service::LinePatternForm;
use crate::services::views::LineView;
use crate::services::IdList;

use super::DeletedCount;

#[utoipa::path(
    get,
    path = "/api/v1/devices",
    responses((status = 200, description = "All devices", body = [Device])),
    tag = "devices"
)]
pub async fn list_devices(
    State(state): State<AppState>,
) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(state.dcim().list_devices().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/devices",
    request_body = DeviceForm,
    responses(
        (status = 201, description = "Device created", body = Device),
        (status = 400, description = "Validation failed or name taken")
    ),
    tag = "devices"
)]
pub async fn create_device(
    State(state): State<AppState>,
    Json(form): Json<DeviceForm>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    let device = state.dcim().create_device(form).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}",
    params(("id" = i32, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Device found", body = Device),
        (status = 404, description = "Device not found")
    ),
    tag = "devices"
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Device>, ApiError> {
    Ok(Json(state.dcim().get_device(id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/devices/{id}",
    params(("id" = i32, Path, description = "Device ID")),
    responses(
        (status = 204, description = "Device, its lines and interfaces deleted"),
        (status = 404, description = "Device not found")
    ),
    tag = "devices"
)]
pub async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.dcim().delete_device(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}/lines",
    params(("id" = i32, Path, description = "Device ID")),
    responses(
        (status = 200, description = "Lines of the device", body = [LineView]),
        (status = 404, description = "Device not found")
    ),
    tag = "devices"
)]
pub async fn list_device_lines(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<LineView>>, ApiError> {
    state.dcim().get_device(id).await?;
    Ok(Json(state.lines().list_for_device(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/devices/{id}/lines",
    params(("id" = i32, Path, description = "Device ID")),
    request_body = LinePatternForm,
    responses(
        (status = 201, description = "Lines created", body = [LineView]),
        (status = 400, description = "Invalid pattern or duplicate name")
    ),
    tag = "devices"
)]
pub async fn create_device_lines(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(form): Json<LinePatternForm>,
) -> Result<(StatusCode, Json<Vec<LineView>>), ApiError> {
    let created = state.lines().create_on_device(id, form).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/devices/{id}/lines/delete",
    params(("id" = i32, Path, description = "Device ID")),
    request_body = IdList,
    responses((status = 200, description = "Lines deleted", body = DeletedCount)),
    tag = "devices"
)]
pub async fn bulk_delete_device_lines(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(ids): Json<IdList>,
) -> Result<Json<DeletedCount>, ApiError> {
    let deleted = state.lines().bulk_delete_on_device(id, &ids.ids).await?;
    Ok(Json(DeletedCount { deleted }))
}

#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}/interfaces",
    params(("id" = i32, Path, description = "Device ID")),
    responses((status = 200, description = "Interfaces of the device", body = [Interface])),
    tag = "devices"
)]
pub async fn list_interfaces(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<Interface>>, ApiError> {
    Ok(Json(state.dcim().list_interfaces(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/devices/{id}/interfaces",
    params(("id" = i32, Path, description = "Device ID")),
    request_body = InterfaceForm,
    responses(
        (status = 201, description = "Interface created", body = Interface),
        (status = 400, description = "Validation failed or name taken")
    ),
    tag = "devices"
)]
pub async fn create_interface(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(form): Json<InterfaceForm>,
) -> Result<(StatusCode, Json<Interface>), ApiError> {
    let interface = state.dcim().create_interface(id, form).await?;
    Ok((StatusCode::CREATED, Json(interface)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/interfaces/{id}",
    params(("id" = i32, Path, description = "Interface ID")),
    responses(
        (status = 204, description = "Interface deleted; its extensions are unlinked"),
        (status = 404, description = "Interface not found")
    ),
    tag = "devices"
)]
pub async fn delete_interface(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.dcim().delete_interface(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
