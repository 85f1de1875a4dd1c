//! Database functionality tests
//!
//! Schema constraints the services rely on: scoped DN uniqueness, the single
//! parent check and the delete rules between inventory tables.

use anyhow::Result;
use chrono::Utc;
use ipphone::database::entities::extensions::ExtensionStatus;
use ipphone::database::entities::*;
use ipphone::database::setup_database;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, Set};
use tempfile::NamedTempFile;

/// Create a test database connection with migrations
async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

async fn insert_device(db: &DatabaseConnection, name: &str) -> Result<devices::Model> {
    Ok(devices::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn insert_line(db: &DatabaseConnection, device_id: i32, name: &str) -> Result<lines::Model> {
    let now = Utc::now();
    Ok(lines::ActiveModel {
        device_id: Set(Some(device_id)),
        name: Set(name.to_string()),
        description: Set(None),
        tags: Set("[]".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

fn extension(dn: &str, scope: Option<&str>) -> extensions::ActiveModel {
    let now = Utc::now();
    extensions::ActiveModel {
        dn: Set(dn.to_string()),
        partition_id: Set(None),
        status: Set(ExtensionStatus::Active),
        line_id: Set(None),
        interface_id: Set(None),
        unique_scope: Set(scope.map(str::to_string)),
        description: Set(None),
        tags: Set("[]".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_database_migrations() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    assert!(partitions::Entity::find().all(&db).await?.is_empty());
    assert!(extensions::Entity::find().all(&db).await?.is_empty());
    assert!(lines::Entity::find().all(&db).await?.is_empty());
    assert!(devices::Entity::find().all(&db).await?.is_empty());
    assert!(interfaces::Entity::find().all(&db).await?.is_empty());
    assert!(object_changes::Entity::find().all(&db).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unique_index_binds_scoped_rows_only() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    extension("1000", Some("global")).insert(&db).await?;
    assert!(extension("1000", Some("global")).insert(&db).await.is_err());

    // Unscoped rows may repeat freely
    extension("1000", None).insert(&db).await?;
    extension("1000", None).insert(&db).await?;

    Ok(())
}

#[tokio::test]
async fn test_extension_cannot_have_two_parents() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let device = insert_device(&db, "desk-1").await?;
    let line = insert_line(&db, device.id, "L1").await?;
    let interface = interfaces::ActiveModel {
        device_id: Set(device.id),
        name: Set("eth0".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    let mut both = extension("2000", None);
    both.line_id = Set(Some(line.id));
    both.interface_id = Set(Some(interface.id));
    assert!(both.insert(&db).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_device_delete_cascades_and_unlinks() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let device = insert_device(&db, "desk-2").await?;
    let line = insert_line(&db, device.id, "L1").await?;

    let mut linked = extension("3000", None);
    linked.line_id = Set(Some(line.id));
    let linked = linked.insert(&db).await?;

    devices::Entity::delete_by_id(device.id).exec(&db).await?;

    assert!(lines::Entity::find_by_id(line.id).one(&db).await?.is_none());
    let survivor = extensions::Entity::find_by_id(linked.id)
        .one(&db)
        .await?
        .expect("extension survives its line");
    assert_eq!(survivor.line_id, None);

    Ok(())
}

#[tokio::test]
async fn test_partition_in_use_cannot_be_deleted() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let now = Utc::now();
    let partition = partitions::ActiveModel {
        name: Set("Internal".to_string()),
        enforce_unique: Set(true),
        description: Set(None),
        tags: Set("[]".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    let mut member = extension("1000", Some(&format!("partition:{}", partition.id)));
    member.partition_id = Set(Some(partition.id));
    member.insert(&db).await?;

    assert!(partitions::Entity::delete_by_id(partition.id)
        .exec(&db)
        .await
        .is_err());

    Ok(())
}
