use sea_orm::{Database, DatabaseConnection};
use tempfile::NamedTempFile;

/// A migrated database on a temporary file. Keep the returned file alive for
/// as long as the connection is used.
pub async fn setup_test_db() -> (DatabaseConnection, NamedTempFile) {
    let temp_file = NamedTempFile::new().expect("Failed to create temp database file");
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url)
        .await
        .expect("Failed to connect to test database");

    super::setup_database(&db)
        .await
        .expect("Failed to run migrations");

    (db, temp_file)
}
