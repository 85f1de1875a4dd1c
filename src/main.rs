use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use ipphone::config::AppConfig;
use ipphone::database::{establish_connection, get_database_url, seed_data, setup_database};
use ipphone::errors::ImportExportError;
use ipphone::server;
use ipphone::services::filters::ExtensionFilter;
use ipphone::services::{ExportService, ImportService, ImportTarget};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// TOML or YAML configuration file
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// SQLite file, overrides `database.path`
    #[clap(short, long, global = true)]
    database: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[clap(short, long)]
        port: Option<u16>,
        #[clap(long)]
        cors_origin: Option<String>,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    /// Load a CSV file; every row is validated before anything is saved
    Import {
        /// partitions, extensions or lines
        target: String,
        file: PathBuf,
    },
    Export {
        #[clap(subcommand)]
        command: ExportCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init,
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
    },
    /// Insert a small example numbering plan
    Seed,
}

#[derive(Subcommand, Debug)]
enum ExportCommands {
    Extensions {
        /// Write to a file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.database.path = database;
    }

    match args.command {
        Commands::Serve { port, cors_origin } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if cors_origin.is_some() {
                config.server.cors_origin = cors_origin;
            }
            info!("Starting server on port {}", config.server.port);
            server::start_server(&config).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Init => {
                info!("Initializing database: {}", config.database.path);
                server::migrate_database(&config.database.path, server::MigrateDirection::Up)
                    .await?;
            }
            DbCommands::Migrate { direction } => {
                info!("Running database migration: {:?}", direction);
                server::migrate_database(&config.database.path, direction).await?;
            }
            DbCommands::Seed => {
                let db = open_database(&config).await?;
                seed_data::create_example_data(&db, config.numbering.policy()).await?;
            }
        },
        Commands::Import { target, file } => {
            let target: ImportTarget = target.parse()?;
            let data = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let db = open_database(&config).await?;
            let importer = ImportService::new(db, config.numbering.policy());
            match importer.import(target, &data).await {
                Ok(count) => info!("Imported {} record(s) from {}", count, file.display()),
                Err(err) => {
                    report_rows(&err);
                    return Err(err.into());
                }
            }
        }
        Commands::Export { command } => match command {
            ExportCommands::Extensions { output } => {
                let db = open_database(&config).await?;
                let csv = ExportService::new(db)
                    .export_extensions(&ExtensionFilter::default())
                    .await?;
                match output {
                    Some(path) => {
                        std::fs::write(&path, csv)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        info!("Exported extensions to {}", path.display());
                    }
                    None => print!("{}", csv),
                }
            }
        },
    }

    Ok(())
}

async fn open_database(config: &AppConfig) -> Result<sea_orm::DatabaseConnection> {
    let database_url = get_database_url(Some(&config.database.path));
    let db = establish_connection(&database_url).await?;
    setup_database(&db).await?;
    Ok(db)
}

fn report_rows(err: &ImportExportError) {
    for row in err.rows() {
        error!("{}", row);
    }
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_deref()
        .unwrap_or("info")
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}
