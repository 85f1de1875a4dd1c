use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{AppConfig, PaginationConfig};
use crate::services::filters::PageParams;
use crate::services::{
    ChangeLogService, DcimService, ExportService, ExtensionService, ImportService, LineService,
    PartitionService, UniquenessPolicy,
};

use super::docs;
use super::handlers::{devices, extensions, health, lines, partitions};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub policy: UniquenessPolicy,
    pub pagination: PaginationConfig,
}

impl AppState {
    pub fn page(&self, params: &PageParams) -> (u64, u64) {
        params.resolve(&self.pagination)
    }

    pub fn partitions(&self) -> PartitionService {
        PartitionService::new(self.db.clone())
    }

    pub fn extensions(&self) -> ExtensionService {
        ExtensionService::new(self.db.clone(), self.policy)
    }

    pub fn lines(&self) -> LineService {
        LineService::new(self.db.clone())
    }

    pub fn dcim(&self) -> DcimService {
        DcimService::new(self.db.clone())
    }

    pub fn importer(&self) -> ImportService {
        ImportService::new(self.db.clone(), self.policy)
    }

    pub fn exporter(&self) -> ExportService {
        ExportService::new(self.db.clone())
    }

    pub fn changelog(&self) -> ChangeLogService {
        ChangeLogService::new(self.db.clone())
    }
}

pub async fn create_app(db: DatabaseConnection, config: &AppConfig) -> Result<Router> {
    let state = AppState {
        db,
        policy: config.numbering.policy(),
        pagination: config.pagination,
    };

    let cors = match config.server.cors_origin.as_deref() {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin '{}'", origin))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        // Health check endpoint
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        // API v1 routes
        .nest("/api/v1", api_v1_routes())
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Partition routes
        .route(
            "/partitions",
            get(partitions::list_partitions).post(partitions::create_partition),
        )
        .route("/partitions/import", post(partitions::import_partitions))
        .route("/partitions/edit", post(partitions::bulk_edit_partitions))
        .route("/partitions/delete", post(partitions::bulk_delete_partitions))
        .route(
            "/partitions/:id",
            get(partitions::get_partition)
                .put(partitions::update_partition)
                .delete(partitions::delete_partition),
        )
        .route("/partitions/:id/changelog", get(partitions::partition_changelog))
        // Extension routes
        .route(
            "/extensions",
            get(extensions::list_extensions).post(extensions::create_extension),
        )
        .route("/extensions/add", get(extensions::add_extension_form))
        .route(
            "/extensions/assign",
            get(extensions::assign_form).post(extensions::assign_search),
        )
        .route("/extensions/bulk-add", post(extensions::bulk_add_extensions))
        .route("/extensions/import", post(extensions::import_extensions))
        .route("/extensions/export", get(extensions::export_extensions))
        .route("/extensions/edit", post(extensions::bulk_edit_extensions))
        .route("/extensions/delete", post(extensions::bulk_delete_extensions))
        .route(
            "/extensions/:id",
            get(extensions::get_extension)
                .put(extensions::update_extension)
                .delete(extensions::delete_extension),
        )
        .route("/extensions/:id/changelog", get(extensions::extension_changelog))
        // Line routes
        .route("/lines", get(lines::list_lines).post(lines::create_line))
        .route("/lines/import", post(lines::import_lines))
        .route("/lines/bulk-add", post(lines::bulk_add_lines))
        .route(
            "/lines/:id",
            get(lines::get_line)
                .put(lines::update_line)
                .delete(lines::delete_line),
        )
        .route("/lines/:id/changelog", get(lines::line_changelog))
        // Device routes
        .route(
            "/devices",
            get(devices::list_devices).post(devices::create_device),
        )
        .route(
            "/devices/:id",
            get(devices::get_device).delete(devices::delete_device),
        )
        .route(
            "/devices/:id/lines",
            get(devices::list_device_lines).post(devices::create_device_lines),
        )
        .route("/devices/:id/lines/delete", post(devices::bulk_delete_device_lines))
        .route(
            "/devices/:id/interfaces",
            get(devices::list_interfaces).post(devices::create_interface),
        )
        .route("/interfaces/:id", delete(devices::delete_interface))
}
