use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

#[cfg(feature = "server")]
use utoipa::ToSchema;

use crate::database::entities::{devices, extensions, lines, partitions};
use crate::errors::validation::{optional_field, require_text};
use crate::errors::{is_unique_violation, LineError, LineResult};
use crate::pattern::expand_pattern;

use super::changelog_service::{ChangeAction, ChangeLogService, ChangedObject};
use super::extension_service;
use super::filters::LineFilter;
use super::tags;
use super::views::{LineView, NestedExtension, Page};

pub const NAME_MAX_LEN: usize = 64;
pub const DESCRIPTION_MAX_LEN: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct LineForm {
    #[serde(default)]
    pub device: Option<i32>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Extension to move onto this line
    #[serde(default)]
    pub extension: Option<i32>,
}

/// Lines created on one device from a name pattern such as `L[1-4]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct LinePatternForm {
    pub name_pattern: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The same line pattern applied to several devices.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct LineBulkAdd {
    pub devices: Vec<i32>,
    pub name_pattern: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

struct NewLine<'a> {
    device: Option<&'a devices::Model>,
    name: String,
    description: Option<String>,
    tags: String,
}

#[derive(Clone)]
pub struct LineService {
    db: DatabaseConnection,
}

impl LineService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: &LineFilter,
        limit: u64,
        offset: u64,
    ) -> LineResult<Page<LineView>> {
        let query = lines::Entity::find().filter(filter.condition()?);
        let count = query.clone().count(&self.db).await?;

        let models = query
            .order_by_asc(lines::Column::DeviceId)
            .order_by_asc(lines::Column::Name)
            .order_by_asc(lines::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;

        let results = line_views(&self.db, &models).await?;
        Ok(Page::new(count, limit, offset, results))
    }

    pub async fn list_for_device(&self, device_id: i32) -> LineResult<Vec<LineView>> {
        load_device(&self.db, device_id).await?;
        let models = lines::Entity::find()
            .filter(lines::Column::DeviceId.eq(device_id))
            .order_by_asc(lines::Column::Name)
            .all(&self.db)
            .await?;
        Ok(line_views(&self.db, &models).await?)
    }

    pub async fn get(&self, id: i32) -> LineResult<LineView> {
        let model = find_line(&self.db, id).await?;
        self.view(model).await
    }

    pub async fn create(&self, form: LineForm) -> LineResult<LineView> {
        let txn = self.db.begin().await?;
        let line = create_in(&txn, form).await?;
        txn.commit().await?;

        info!("Created line {} ({})", line.name, line.id);
        self.view(line).await
    }

    /// Edit a line. `extension`, when given, is moved onto the line in the
    /// same transaction.
    pub async fn update(&self, id: i32, form: LineForm) -> LineResult<LineView> {
        let name = require_text("name", &form.name, NAME_MAX_LEN)?;
        let description = optional_field(
            "description",
            form.description.as_deref(),
            DESCRIPTION_MAX_LEN,
        )?;

        let txn = self.db.begin().await?;
        let existing = find_line(&txn, id).await?;
        let device_id = form.device.or(existing.device_id);
        let device = match device_id {
            Some(device_id) => Some(load_device(&txn, device_id).await?),
            None => None,
        };
        ensure_name_free(&txn, device.as_ref(), &name, Some(id)).await?;

        let mut active: lines::ActiveModel = existing.into();
        active.device_id = Set(device_id);
        active.name = Set(name.clone());
        active.description = Set(description);
        active.tags = Set(tags::encode(&form.tags));
        active.updated_at = Set(Utc::now());
        let line = active
            .update(&txn)
            .await
            .map_err(|err| duplicate_or(err, device.as_ref(), &name))?;
        ChangeLogService::record(&txn, ChangeAction::Update, changed(&line), &line).await?;

        if let Some(extension_id) = form.extension {
            attach_extension(&txn, &line, extension_id).await?;
        }
        txn.commit().await?;

        info!("Updated line {} ({})", line.name, line.id);
        self.view(line).await
    }

    /// Extensions on the line are unlinked, not deleted.
    pub async fn delete(&self, id: i32) -> LineResult<()> {
        let txn = self.db.begin().await?;
        let line = find_line(&txn, id).await?;
        lines::Entity::delete_by_id(id).exec(&txn).await?;
        ChangeLogService::record(&txn, ChangeAction::Delete, changed(&line), &line).await?;
        txn.commit().await?;

        info!("Deleted line {} ({})", line.name, id);
        Ok(())
    }

    /// Create every line named by `form.name_pattern` on one device, or none.
    pub async fn create_on_device(
        &self,
        device_id: i32,
        form: LinePatternForm,
    ) -> LineResult<Vec<LineView>> {
        self.bulk_add(LineBulkAdd {
            devices: vec![device_id],
            name_pattern: form.name_pattern,
            description: form.description,
            tags: form.tags,
        })
        .await
    }

    pub async fn bulk_add(&self, request: LineBulkAdd) -> LineResult<Vec<LineView>> {
        let names = expand_pattern(&request.name_pattern)
            .map_err(|err| LineError::InvalidPattern(err.to_string()))?;
        for name in &names {
            require_text("name_pattern", name, NAME_MAX_LEN)?;
        }
        let description = optional_field(
            "description",
            request.description.as_deref(),
            DESCRIPTION_MAX_LEN,
        )?;
        let tags = tags::encode(&request.tags);

        let txn = self.db.begin().await?;
        let mut created = Vec::new();
        for device_id in &request.devices {
            let device = load_device(&txn, *device_id).await?;
            for name in &names {
                let line = insert_line(
                    &txn,
                    NewLine {
                        device: Some(&device),
                        name: name.clone(),
                        description: description.clone(),
                        tags: tags.clone(),
                    },
                )
                .await?;
                created.push(line);
            }
        }
        txn.commit().await?;

        info!(
            "Created {} line(s) from {:?} on {} device(s)",
            created.len(),
            request.name_pattern,
            request.devices.len()
        );
        Ok(line_views(&self.db, &created).await?)
    }

    /// Delete the given lines of one device; IDs on other devices are skipped.
    pub async fn bulk_delete_on_device(&self, device_id: i32, ids: &[i32]) -> LineResult<u64> {
        let txn = self.db.begin().await?;
        load_device(&txn, device_id).await?;
        let models = lines::Entity::find()
            .filter(lines::Column::DeviceId.eq(device_id))
            .filter(lines::Column::Id.is_in(ids.to_vec()))
            .all(&txn)
            .await?;

        for line in &models {
            lines::Entity::delete_by_id(line.id).exec(&txn).await?;
            ChangeLogService::record(&txn, ChangeAction::Delete, changed(line), line).await?;
        }
        txn.commit().await?;

        info!("Deleted {} line(s) from device {}", models.len(), device_id);
        Ok(models.len() as u64)
    }

    async fn view(&self, model: lines::Model) -> LineResult<LineView> {
        let id = model.id;
        line_views(&self.db, &[model])
            .await?
            .pop()
            .ok_or(LineError::NotFound(id))
    }
}

pub(crate) async fn find_line<C: ConnectionTrait>(conn: &C, id: i32) -> LineResult<lines::Model> {
    lines::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(LineError::NotFound(id))
}

async fn load_device<C: ConnectionTrait>(conn: &C, id: i32) -> LineResult<devices::Model> {
    devices::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(LineError::DeviceNotFound(id))
}

/// Insert a line inside the caller's transaction, attaching `form.extension`
/// when given.
pub(crate) async fn create_in<C: ConnectionTrait>(
    conn: &C,
    form: LineForm,
) -> LineResult<lines::Model> {
    let device = match form.device {
        Some(id) => Some(load_device(conn, id).await?),
        None => None,
    };
    let line = insert_line(
        conn,
        NewLine {
            device: device.as_ref(),
            name: require_text("name", &form.name, NAME_MAX_LEN)?,
            description: optional_field(
                "description",
                form.description.as_deref(),
                DESCRIPTION_MAX_LEN,
            )?,
            tags: tags::encode(&form.tags),
        },
    )
    .await?;

    if let Some(extension_id) = form.extension {
        attach_extension(conn, &line, extension_id).await?;
    }
    Ok(line)
}

async fn ensure_name_free<C: ConnectionTrait>(
    conn: &C,
    device: Option<&devices::Model>,
    name: &str,
    exclude_id: Option<i32>,
) -> LineResult<()> {
    // Lines without a device are exempt from the (device, name) rule.
    let Some(device) = device else {
        return Ok(());
    };

    let mut query = lines::Entity::find()
        .filter(lines::Column::DeviceId.eq(device.id))
        .filter(lines::Column::Name.eq(name));
    if let Some(id) = exclude_id {
        query = query.filter(lines::Column::Id.ne(id));
    }

    if query.one(conn).await?.is_some() {
        return Err(LineError::DuplicateName {
            device: device.name.clone(),
            name: name.to_string(),
        });
    }
    Ok(())
}

fn duplicate_or(err: DbErr, device: Option<&devices::Model>, name: &str) -> LineError {
    match device {
        Some(device) if is_unique_violation(&err) => LineError::DuplicateName {
            device: device.name.clone(),
            name: name.to_string(),
        },
        _ => LineError::Database(err),
    }
}

async fn insert_line<C: ConnectionTrait>(conn: &C, new: NewLine<'_>) -> LineResult<lines::Model> {
    ensure_name_free(conn, new.device, &new.name, None).await?;

    let now = Utc::now();
    let line = lines::ActiveModel {
        device_id: Set(new.device.map(|d| d.id)),
        name: Set(new.name.clone()),
        description: Set(new.description),
        tags: Set(new.tags),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|err| duplicate_or(err, new.device, &new.name))?;

    ChangeLogService::record(conn, ChangeAction::Create, changed(&line), &line).await?;
    Ok(line)
}

/// Point an extension at `line`, replacing whatever parent it had.
pub(crate) async fn attach_extension<C: ConnectionTrait>(
    conn: &C,
    line: &lines::Model,
    extension_id: i32,
) -> LineResult<extensions::Model> {
    let extension = extensions::Entity::find_by_id(extension_id)
        .one(conn)
        .await?
        .ok_or(LineError::ExtensionNotFound(extension_id))?;

    let mut active: extensions::ActiveModel = extension.into();
    active.line_id = Set(Some(line.id));
    active.interface_id = Set(None);
    active.updated_at = Set(Utc::now());
    let extension = active.update(conn).await?;

    ChangeLogService::record(
        conn,
        ChangeAction::Update,
        extension_service::changed(&extension),
        &extension,
    )
    .await?;
    info!("Attached extension {} to line {}", extension.dn, line.name);
    Ok(extension)
}

/// Hydrate lines with their device and the extensions pointing at them.
pub(crate) async fn line_views<C: ConnectionTrait>(
    conn: &C,
    models: &[lines::Model],
) -> Result<Vec<LineView>, DbErr> {
    let line_ids: Vec<i32> = models.iter().map(|l| l.id).collect();
    let device_ids: HashSet<i32> = models.iter().filter_map(|l| l.device_id).collect();

    let devices: HashMap<i32, devices::Model> = devices::Entity::find()
        .filter(devices::Column::Id.is_in(device_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();

    let assigned = extensions::Entity::find()
        .filter(extensions::Column::LineId.is_in(line_ids))
        .order_by_asc(extensions::Column::Dn)
        .all(conn)
        .await?;
    let partition_ids: HashSet<i32> = assigned.iter().filter_map(|e| e.partition_id).collect();
    let partitions: HashMap<i32, partitions::Model> = partitions::Entity::find()
        .filter(partitions::Column::Id.is_in(partition_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut by_line: HashMap<i32, Vec<NestedExtension>> = HashMap::new();
    for extension in &assigned {
        if let Some(line_id) = extension.line_id {
            by_line.entry(line_id).or_default().push(NestedExtension::new(
                extension,
                extension.partition_id.and_then(|p| partitions.get(&p)),
            ));
        }
    }

    Ok(models
        .iter()
        .map(|line| {
            LineView::new(
                line,
                line.device_id.and_then(|d| devices.get(&d)),
                by_line.remove(&line.id).unwrap_or_default(),
            )
        })
        .collect())
}

fn changed(line: &lines::Model) -> ChangedObject<'_> {
    ChangedObject {
        object_type: "line",
        id: line.id,
        repr: &line.name,
        related: line.device_id.map(|id| ("device", id)),
    }
}
