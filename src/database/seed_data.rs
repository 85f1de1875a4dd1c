use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::info;

use crate::database::entities::devices;
use crate::services::dcim_service::{DcimService, DeviceForm, InterfaceForm};
use crate::services::extension_service::{ExtensionBulkAdd, ExtensionForm, StatusValue};
use crate::services::line_service::{LinePatternForm, LineService};
use crate::services::partition_service::{PartitionForm, PartitionService};
use crate::services::{ExtensionService, ParentHint, UniquenessPolicy};

const EXAMPLE_DEVICE: &str = "reception-phone";

/// Populate an empty database with a small, linked example inventory.
pub async fn create_example_data(db: &DatabaseConnection, policy: UniquenessPolicy) -> Result<()> {
    let existing = devices::Entity::find()
        .filter(devices::Column::Name.eq(EXAMPLE_DEVICE))
        .one(db)
        .await?;
    if existing.is_some() {
        info!("Example data already exists, skipping seed data creation");
        return Ok(());
    }

    info!("Creating example numbering plan");
    let partitions = PartitionService::new(db.clone());
    let internal = partitions
        .create(PartitionForm {
            name: "Internal".to_string(),
            enforce_unique: true,
            description: Some("Office extensions".to_string()),
            tags: vec!["office".to_string()],
        })
        .await
        .context("Failed to create Internal partition")?;
    partitions
        .create(PartitionForm {
            name: "Lab".to_string(),
            enforce_unique: false,
            description: Some("Test numbers, may overlap".to_string()),
            tags: vec!["lab".to_string()],
        })
        .await
        .context("Failed to create Lab partition")?;

    let dcim = DcimService::new(db.clone());
    let device = dcim
        .create_device(DeviceForm {
            name: EXAMPLE_DEVICE.to_string(),
        })
        .await
        .context("Failed to create example device")?;
    let interface = dcim
        .create_interface(
            device.id,
            InterfaceForm {
                name: "eth0".to_string(),
            },
        )
        .await
        .context("Failed to create example interface")?;

    let lines = LineService::new(db.clone())
        .create_on_device(
            device.id,
            LinePatternForm {
                name_pattern: "L[1-2]".to_string(),
                description: None,
                tags: vec![],
            },
        )
        .await
        .context("Failed to create example lines")?;

    let extensions = ExtensionService::new(db.clone(), policy);
    let batch = extensions
        .bulk_add(ExtensionBulkAdd {
            pattern: "10[00-09]".to_string(),
            partition: Some(internal.id),
            status: None,
            description: None,
            tags: vec![],
        })
        .await
        .context("Failed to create example extensions")?;
    info!("Created {} example extension(s)", batch.created.len());

    if let Some(line) = lines.first() {
        extensions
            .create(
                ExtensionForm {
                    dn: "2000".to_string(),
                    partition: Some(internal.id),
                    description: Some("Reception".to_string()),
                    ..Default::default()
                },
                ParentHint::line(line.id),
            )
            .await
            .context("Failed to create reception extension")?;
    }
    extensions
        .create(
            ExtensionForm {
                dn: "2999".to_string(),
                status: Some(StatusValue::Text("inactive".to_string())),
                description: Some("Softphone".to_string()),
                ..Default::default()
            },
            ParentHint::interface(interface.id),
        )
        .await
        .context("Failed to create softphone extension")?;

    info!("Successfully created example data");
    Ok(())
}
