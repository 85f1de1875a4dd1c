use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::services::filters::{LineFilter, PageParams};
use crate::services::line_service::{LineBulkAdd, LineForm};
use crate::services::views::{LinePage, LineView, ObjectChangeView};

#[utoipa::path(
    get,
    path = "/api/v1/lines",
    params(PageParams, LineFilter),
    responses(
        (status = 200, description = "Paginated lines", body = LinePage),
        (status = 400, description = "Invalid filter")
    ),
    tag = "lines"
)]
pub async fn list_lines(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<LineFilter>,
) -> Result<Json<LinePage>, ApiError> {
    let (limit, offset) = state.page(&page);
    Ok(Json(state.lines().list(&filter, limit, offset).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/lines",
    request_body = LineForm,
    responses(
        (status = 201, description = "Line created", body = LineView),
        (status = 400, description = "Validation failed")
    ),
    tag = "lines"
)]
pub async fn create_line(
    State(state): State<AppState>,
    Json(form): Json<LineForm>,
) -> Result<(StatusCode, Json<LineView>), ApiError> {
    let line = state.lines().create(form).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lines/{id}",
    params(("id" = i32, Path, description = "Line ID")),
    responses(
        (status = 200, description = "Line with its assigned extensions", body = LineView),
        (status = 404, description = "Line not found")
    ),
    tag = "lines"
)]
pub async fn get_line(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<LineView>, ApiError> {
    Ok(Json(state.lines().get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/lines/{id}",
    params(("id" = i32, Path, description = "Line ID")),
    request_body = LineForm,
    responses(
        (status = 200, description = "Line updated", body = LineView),
        (status = 404, description = "Line not found")
    ),
    tag = "lines"
)]
pub async fn update_line(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(form): Json<LineForm>,
) -> Result<Json<LineView>, ApiError> {
    Ok(Json(state.lines().update(id, form).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lines/{id}",
    params(("id" = i32, Path, description = "Line ID")),
    responses(
        (status = 204, description = "Line deleted; its extensions are unlinked"),
        (status = 404, description = "Line not found")
    ),
    tag = "lines"
)]
pub async fn delete_line(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.lines().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/lines/import",
    request_body(content = String, content_type = "text/csv", description = "Columns: device, name, description"),
    responses(
        (status = 201, description = "All rows imported", body = [LineView]),
        (status = 400, description = "Invalid CSV or rejected rows; nothing saved")
    ),
    tag = "lines"
)]
pub async fn import_lines(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<Vec<LineView>>), ApiError> {
    let created = state.importer().import_lines(&body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/lines/bulk-add",
    request_body = LineBulkAdd,
    responses(
        (status = 201, description = "Lines created on every device", body = [LineView]),
        (status = 400, description = "Invalid pattern, unknown device or duplicate name")
    ),
    tag = "lines"
)]
pub async fn bulk_add_lines(
    State(state): State<AppState>,
    Json(request): Json<LineBulkAdd>,
) -> Result<(StatusCode, Json<Vec<LineView>>), ApiError> {
    let created = state.lines().bulk_add(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lines/{id}/changelog",
    params(("id" = i32, Path, description = "Line ID")),
    responses((status = 200, description = "Changes, newest first", body = [ObjectChangeView])),
    tag = "lines"
)]
pub async fn line_changelog(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ObjectChangeView>>, ApiError> {
    Ok(Json(state.changelog().list_for("line", id).await?))
}
