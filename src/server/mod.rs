pub mod app;
pub mod docs;
pub mod error;
pub mod handlers;

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

use crate::config::AppConfig;
use crate::database::{connection::*, migrations::Migrator};
use crate::services::ExtensionService;
use anyhow::{Context, Result};
use sea_orm_migration::prelude::*;
use tracing::info;

pub async fn start_server(config: &AppConfig) -> Result<()> {
    let database_url = get_database_url(Some(&config.database.path));
    let db = establish_connection(&database_url).await?;

    // Run migrations
    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    // Partition-less extensions must match the configured global policy
    let synced = ExtensionService::new(db.clone(), config.numbering.policy())
        .apply_global_policy()
        .await
        .context("Cannot apply numbering.enforce_global_unique")?;
    info!(
        "Global DN uniqueness {} ({} extension(s) synced)",
        if config.numbering.enforce_global_unique {
            "enforced"
        } else {
            "not enforced"
        },
        synced
    );

    let port = config.server.port;
    let app = app::create_app(db, config).await?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                     - Health check");
    info!("  /api-docs/openapi.json      - OpenAPI document");
    info!("  /api/v1/partitions          - Numbering partitions");
    info!("  /api/v1/extensions          - Directory numbers, assign, bulk-add, import/export");
    info!("  /api/v1/lines               - Phone lines");
    info!("  /api/v1/devices             - Devices, their lines and interfaces");
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::fresh(&db).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
