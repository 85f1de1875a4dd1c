//! Devices and interfaces: the minimal inventory lines and extensions hang off.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::info;

#[cfg(feature = "server")]
use utoipa::ToSchema;

use crate::database::entities::{devices, interfaces};
use crate::errors::validation::require_text;
use crate::errors::{is_unique_violation, DcimError, DcimResult};

pub const NAME_MAX_LEN: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct DeviceForm {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct InterfaceForm {
    pub name: String,
}

#[derive(Clone)]
pub struct DcimService {
    db: DatabaseConnection,
}

impl DcimService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_devices(&self) -> DcimResult<Vec<devices::Model>> {
        Ok(devices::Entity::find()
            .order_by_asc(devices::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn get_device(&self, id: i32) -> DcimResult<devices::Model> {
        find_device(&self.db, id).await
    }

    pub async fn create_device(&self, form: DeviceForm) -> DcimResult<devices::Model> {
        let name = require_text("name", &form.name, NAME_MAX_LEN)?;

        let existing = devices::Entity::find()
            .filter(devices::Column::Name.eq(name.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(DcimError::DuplicateDevice(name));
        }

        let device = devices::ActiveModel {
            name: Set(name.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                DcimError::DuplicateDevice(name)
            } else {
                DcimError::Database(err)
            }
        })?;

        info!("Created device {} ({})", device.name, device.id);
        Ok(device)
    }

    /// Lines and interfaces go with the device; their extensions are unlinked.
    pub async fn delete_device(&self, id: i32) -> DcimResult<()> {
        let device = find_device(&self.db, id).await?;
        devices::Entity::delete_by_id(id).exec(&self.db).await?;

        info!("Deleted device {} ({})", device.name, id);
        Ok(())
    }

    pub async fn list_interfaces(&self, device_id: i32) -> DcimResult<Vec<interfaces::Model>> {
        find_device(&self.db, device_id).await?;
        Ok(interfaces::Entity::find()
            .filter(interfaces::Column::DeviceId.eq(device_id))
            .order_by_asc(interfaces::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn create_interface(
        &self,
        device_id: i32,
        form: InterfaceForm,
    ) -> DcimResult<interfaces::Model> {
        let device = find_device(&self.db, device_id).await?;
        let name = require_text("name", &form.name, NAME_MAX_LEN)?;
        let duplicate = || DcimError::DuplicateInterface {
            device: device.name.clone(),
            name: name.clone(),
        };

        let existing = interfaces::Entity::find()
            .filter(interfaces::Column::DeviceId.eq(device_id))
            .filter(interfaces::Column::Name.eq(name.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(duplicate());
        }

        let interface = interfaces::ActiveModel {
            device_id: Set(device_id),
            name: Set(name.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                duplicate()
            } else {
                DcimError::Database(err)
            }
        })?;

        info!("Created interface {} on {}", interface.name, device.name);
        Ok(interface)
    }

    pub async fn delete_interface(&self, id: i32) -> DcimResult<()> {
        let result = interfaces::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(DcimError::InterfaceNotFound(id));
        }

        info!("Deleted interface {}", id);
        Ok(())
    }
}

pub(crate) async fn find_device<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> DcimResult<devices::Model> {
    devices::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(DcimError::DeviceNotFound(id))
}
