use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::services::extension_service::{
    AssignSearch, BulkAddResult, ExtensionBulkAdd, ExtensionBulkEdit, ExtensionDefaults,
    ExtensionForm,
};
use crate::services::filters::{ExtensionFilter, PageParams};
use crate::services::views::{ExtensionPage, ExtensionView, ObjectChangeView, ParentView};
use crate::services::{IdList, ParentHint};

use super::DeletedCount;

const ADD_FORM_URL: &str = "/api/v1/extensions/add";

/// Description of the assign search form for one parent.
#[derive(Debug, Serialize, ToSchema)]
pub struct AssignForm {
    pub target: ParentView,
    pub fields: Vec<AssignField>,
    pub search_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignField {
    pub name: String,
    pub kind: String,
    pub required: bool,
    pub help: String,
}

impl AssignField {
    fn new(name: &str, kind: &str, required: bool, help: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            required,
            help: help.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignCandidate {
    #[serde(flatten)]
    pub extension: ExtensionView,
    /// Edit endpoint with the target parent pre-selected
    pub edit_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignResults {
    pub target: ParentView,
    pub results: Vec<AssignCandidate>,
}

fn assign_fields() -> Vec<AssignField> {
    vec![
        AssignField::new("dn", "string", true, "Directory number prefix"),
        AssignField::new(
            "unassigned_only",
            "boolean",
            false,
            "Only show extensions without a line or interface",
        ),
    ]
}

#[utoipa::path(
    get,
    path = "/api/v1/extensions",
    params(PageParams, ExtensionFilter),
    responses(
        (status = 200, description = "Paginated extensions", body = ExtensionPage),
        (status = 400, description = "Invalid filter")
    ),
    tag = "extensions"
)]
pub async fn list_extensions(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<ExtensionFilter>,
) -> Result<Json<ExtensionPage>, ApiError> {
    let (limit, offset) = state.page(&page);
    Ok(Json(state.extensions().list(&filter, limit, offset).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/extensions",
    params(ParentHint),
    request_body = ExtensionForm,
    responses(
        (status = 201, description = "Extension created", body = ExtensionView),
        (status = 400, description = "Validation failed or duplicate DN")
    ),
    tag = "extensions"
)]
pub async fn create_extension(
    State(state): State<AppState>,
    Query(hint): Query<ParentHint>,
    Json(form): Json<ExtensionForm>,
) -> Result<(StatusCode, Json<ExtensionView>), ApiError> {
    let extension = state.extensions().create(form, hint).await?;
    Ok((StatusCode::CREATED, Json(extension)))
}

#[utoipa::path(
    get,
    path = "/api/v1/extensions/add",
    params(ParentHint),
    responses((status = 200, description = "Defaults for a new extension", body = ExtensionDefaults)),
    tag = "extensions"
)]
pub async fn add_extension_form(
    State(state): State<AppState>,
    Query(hint): Query<ParentHint>,
) -> Result<Json<ExtensionDefaults>, ApiError> {
    Ok(Json(state.extensions().add_form(&hint).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/extensions/assign",
    params(ParentHint),
    responses(
        (status = 200, description = "Search form for the target parent", body = AssignForm),
        (status = 303, description = "No usable parent; redirect to the add form")
    ),
    tag = "extensions"
)]
pub async fn assign_form(
    State(state): State<AppState>,
    Query(hint): Query<ParentHint>,
) -> Result<Response, ApiError> {
    let Some(target) = state.extensions().resolve_target(&hint).await? else {
        debug!("Assign form without a resolvable parent, redirecting");
        return Ok(Redirect::to(ADD_FORM_URL).into_response());
    };

    let search_url = match hint.query_string() {
        Some(query) => format!("/api/v1/extensions/assign?{}", query),
        None => "/api/v1/extensions/assign".to_string(),
    };
    Ok(Json(AssignForm {
        target,
        fields: assign_fields(),
        search_url,
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/extensions/assign",
    params(ParentHint),
    request_body = AssignSearch,
    responses(
        (status = 200, description = "Matching extensions, up to 100", body = AssignResults),
        (status = 303, description = "No usable parent; redirect to the add form"),
        (status = 400, description = "Empty prefix")
    ),
    tag = "extensions"
)]
pub async fn assign_search(
    State(state): State<AppState>,
    Query(hint): Query<ParentHint>,
    Json(search): Json<AssignSearch>,
) -> Result<Response, ApiError> {
    let service = state.extensions();
    let Some(target) = service.resolve_target(&hint).await? else {
        debug!("Assign search without a resolvable parent, redirecting");
        return Ok(Redirect::to(ADD_FORM_URL).into_response());
    };

    let selector = match &target {
        ParentView::Line { id, .. } => format!("line={}", id),
        ParentView::Interface { id, .. } => format!("interface={}", id),
    };
    let results = service
        .search_by_prefix(&search)
        .await?
        .into_iter()
        .map(|extension| AssignCandidate {
            edit_url: format!("/api/v1/extensions/{}?{}", extension.id, selector),
            extension,
        })
        .collect();

    Ok(Json(AssignResults { target, results }).into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/extensions/bulk-add",
    request_body = ExtensionBulkAdd,
    responses(
        (status = 200, description = "Created records and per-DN failures", body = BulkAddResult),
        (status = 400, description = "Invalid pattern")
    ),
    tag = "extensions"
)]
pub async fn bulk_add_extensions(
    State(state): State<AppState>,
    Json(request): Json<ExtensionBulkAdd>,
) -> Result<Json<BulkAddResult>, ApiError> {
    Ok(Json(state.extensions().bulk_add(request).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/extensions/import",
    request_body(content = String, content_type = "text/csv", description = "Columns: dn, partition, status, device, line_name, description"),
    responses(
        (status = 201, description = "All rows imported", body = [ExtensionView]),
        (status = 400, description = "Invalid CSV or rejected rows; nothing saved")
    ),
    tag = "extensions"
)]
pub async fn import_extensions(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<Vec<ExtensionView>>), ApiError> {
    let created = state.importer().import_extensions(&body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/extensions/export",
    params(ExtensionFilter),
    responses((status = 200, description = "Extensions as CSV", content_type = "text/csv", body = String)),
    tag = "extensions"
)]
pub async fn export_extensions(
    State(state): State<AppState>,
    Query(filter): Query<ExtensionFilter>,
) -> Result<Response, ApiError> {
    let csv = state.exporter().export_extensions(&filter).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"extensions.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/extensions/edit",
    request_body = ExtensionBulkEdit,
    responses((status = 200, description = "Extensions updated", body = [ExtensionView])),
    tag = "extensions"
)]
pub async fn bulk_edit_extensions(
    State(state): State<AppState>,
    Json(edit): Json<ExtensionBulkEdit>,
) -> Result<Json<Vec<ExtensionView>>, ApiError> {
    Ok(Json(state.extensions().bulk_edit(edit).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/extensions/delete",
    request_body = IdList,
    responses((status = 200, description = "Extensions deleted", body = DeletedCount)),
    tag = "extensions"
)]
pub async fn bulk_delete_extensions(
    State(state): State<AppState>,
    Json(ids): Json<IdList>,
) -> Result<Json<DeletedCount>, ApiError> {
    let deleted = state.extensions().bulk_delete(&ids.ids).await?;
    Ok(Json(DeletedCount { deleted }))
}

#[utoipa::path(
    get,
    path = "/api/v1/extensions/{id}",
    params(("id" = i32, Path, description = "Extension ID")),
    responses(
        (status = 200, description = "Extension found", body = ExtensionView),
        (status = 404, description = "Extension not found")
    ),
    tag = "extensions"
)]
pub async fn get_extension(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ExtensionView>, ApiError> {
    Ok(Json(state.extensions().get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/extensions/{id}",
    params(("id" = i32, Path, description = "Extension ID"), ParentHint),
    request_body = ExtensionForm,
    responses(
        (status = 200, description = "Extension updated", body = ExtensionView),
        (status = 400, description = "Validation failed or duplicate DN"),
        (status = 404, description = "Extension not found")
    ),
    tag = "extensions"
)]
pub async fn update_extension(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(hint): Query<ParentHint>,
    Json(form): Json<ExtensionForm>,
) -> Result<Json<ExtensionView>, ApiError> {
    Ok(Json(state.extensions().update(id, form, hint).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/extensions/{id}",
    params(("id" = i32, Path, description = "Extension ID")),
    responses(
        (status = 204, description = "Extension deleted"),
        (status = 404, description = "Extension not found")
    ),
    tag = "extensions"
)]
pub async fn delete_extension(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.extensions().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/extensions/{id}/changelog",
    params(("id" = i32, Path, description = "Extension ID")),
    responses((status = 200, description = "Changes, newest first", body = [ObjectChangeView])),
    tag = "extensions"
)]
pub async fn extension_changelog(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ObjectChangeView>>, ApiError> {
    Ok(Json(state.changelog().list_for("extension", id).await?))
}
