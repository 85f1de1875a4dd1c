use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::services::filters::{PageParams, PartitionFilter};
use crate::services::partition_service::{PartitionBulkEdit, PartitionForm};
use crate::services::views::{ObjectChangeView, PartitionPage, PartitionView};
use crate::services::IdList;

use super::DeletedCount;

#[utoipa::path(
    get,
    path = "/api/v1/partitions",
    params(PageParams, PartitionFilter),
    responses(
        (status = 200, description = "Paginated partitions", body = PartitionPage),
        (status = 400, description = "Invalid filter")
    ),
    tag = "partitions"
)]
pub async fn list_partitions(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<PartitionFilter>,
) -> Result<Json<PartitionPage>, ApiError> {
    let (limit, offset) = state.page(&page);
    Ok(Json(state.partitions().list(&filter, limit, offset).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/partitions",
    request_body = PartitionForm,
    responses(
        (status = 201, description = "Partition created", body = PartitionView),
        (status = 400, description = "Validation failed")
    ),
    tag = "partitions"
)]
pub async fn create_partition(
    State(state): State<AppState>,
    Json(form): Json<PartitionForm>,
) -> Result<(StatusCode, Json<PartitionView>), ApiError> {
    let partition = state.partitions().create(form).await?;
    Ok((StatusCode::CREATED, Json(partition)))
}

#[utoipa::path(
    get,
    path = "/api/v1/partitions/{id}",
    params(("id" = i32, Path, description = "Partition ID")),
    responses(
        (status = 200, description = "Partition found", body = PartitionView),
        (status = 404, description = "Partition not found")
    ),
    tag = "partitions"
)]
pub async fn get_partition(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PartitionView>, ApiError> {
    Ok(Json(state.partitions().get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/partitions/{id}",
    params(("id" = i32, Path, description = "Partition ID")),
    request_body = PartitionForm,
    responses(
        (status = 200, description = "Partition updated", body = PartitionView),
        (status = 404, description = "Partition not found"),
        (status = 409, description = "Uniqueness cannot be enforced over existing duplicates")
    ),
    tag = "partitions"
)]
pub async fn update_partition(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(form): Json<PartitionForm>,
) -> Result<Json<PartitionView>, ApiError> {
    Ok(Json(state.partitions().update(id, form).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/partitions/{id}",
    params(("id" = i32, Path, description = "Partition ID")),
    responses(
        (status = 204, description = "Partition deleted"),
        (status = 404, description = "Partition not found"),
        (status = 409, description = "Partition still referenced by extensions")
    ),
    tag = "partitions"
)]
pub async fn delete_partition(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.partitions().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/partitions/import",
    request_body(content = String, content_type = "text/csv", description = "Columns: name, enforce_unique, description"),
    responses(
        (status = 201, description = "All rows imported", body = [PartitionView]),
        (status = 400, description = "Invalid CSV or rejected rows; nothing saved")
    ),
    tag = "partitions"
)]
pub async fn import_partitions(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<Vec<PartitionView>>), ApiError> {
    let created = state.importer().import_partitions(&body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/partitions/edit",
    request_body = PartitionBulkEdit,
    responses(
        (status = 200, description = "Partitions updated", body = [PartitionView]),
        (status = 409, description = "Uniqueness cannot be enforced over existing duplicates")
    ),
    tag = "partitions"
)]
pub async fn bulk_edit_partitions(
    State(state): State<AppState>,
    Json(edit): Json<PartitionBulkEdit>,
) -> Result<Json<Vec<PartitionView>>, ApiError> {
    Ok(Json(state.partitions().bulk_edit(edit).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/partitions/delete",
    request_body = IdList,
    responses(
        (status = 200, description = "Partitions deleted", body = DeletedCount),
        (status = 409, description = "A partition is still referenced; nothing deleted")
    ),
    tag = "partitions"
)]
pub async fn bulk_delete_partitions(
    State(state): State<AppState>,
    Json(ids): Json<IdList>,
) -> Result<Json<DeletedCount>, ApiError> {
    let deleted = state.partitions().bulk_delete(&ids.ids).await?;
    Ok(Json(DeletedCount { deleted }))
}

#[utoipa::path(
    get,
    path = "/api/v1/partitions/{id}/changelog",
    params(("id" = i32, Path, description = "Partition ID")),
    responses((status = 200, description = "Changes, newest first", body = [ObjectChangeView])),
    tag = "partitions"
)]
pub async fn partition_changelog(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ObjectChangeView>>, ApiError> {
    Ok(Json(state.changelog().list_for("partition", id).await?))
}
