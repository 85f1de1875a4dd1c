use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

#[cfg(feature = "server")]
use utoipa::{IntoParams, ToSchema};

use crate::database::entities::extensions::{ExtensionStatus, ParentLink};
use crate::database::entities::{devices, extensions, interfaces, lines, partitions};
use crate::errors::validation::{optional_field, require_text};
use crate::errors::{is_unique_violation, ExtensionError, ExtensionResult};
use crate::pattern::expand_pattern;

use super::changelog_service::{ChangeAction, ChangeLogService, ChangedObject};
use super::filters::{istarts_with, ExtensionFilter};
use super::uniqueness::{self, UniquenessPolicy};
use super::views::{ExtensionView, Page, ParentView};
use super::{tags, BulkNullify};

pub const DN_MAX_LEN: usize = 25;
pub const DESCRIPTION_MAX_LEN: usize = 100;
/// Assign searches return at most this many records.
pub const ASSIGN_SEARCH_LIMIT: u64 = 100;

/// Status given either by value (`1`) or by name/label (`"active"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(untagged)]
pub enum StatusValue {
    Number(i64),
    Text(String),
}

impl StatusValue {
    pub fn resolve(&self) -> ExtensionResult<ExtensionStatus> {
        let raw = match self {
            StatusValue::Number(n) => n.to_string(),
            StatusValue::Text(text) => text.clone(),
        };
        raw.parse()
            .map_err(|_| ExtensionError::InvalidStatus(raw.trim().to_string()))
    }
}

impl From<ExtensionStatus> for StatusValue {
    fn from(status: ExtensionStatus) -> Self {
        StatusValue::Number(status.value() as i64)
    }
}

/// Identifier that may arrive as a number or a string; unparseable values
/// are treated like absent ones.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(untagged)]
pub enum LooseId {
    Number(i64),
    Text(String),
}

impl LooseId {
    fn into_raw(self) -> String {
        match self {
            LooseId::Number(n) => n.to_string(),
            LooseId::Text(text) => text,
        }
    }
}

/// Parent selector from `?line=` / `?interface=`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "server", derive(IntoParams))]
#[cfg_attr(feature = "server", into_params(parameter_in = Query))]
pub struct ParentHint {
    /// Line to attach the extension to
    pub line: Option<String>,
    /// Interface to attach the extension to
    pub interface: Option<String>,
}

impl ParentHint {
    pub fn line(id: i32) -> Self {
        Self {
            line: Some(id.to_string()),
            interface: None,
        }
    }

    pub fn interface(id: i32) -> Self {
        Self {
            line: None,
            interface: Some(id.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_none() && self.interface.is_none()
    }

    /// Overlay selectors from a request body; body values win per field.
    pub fn merged(&self, line: Option<LooseId>, interface: Option<LooseId>) -> Self {
        Self {
            line: line.map(LooseId::into_raw).or_else(|| self.line.clone()),
            interface: interface
                .map(LooseId::into_raw)
                .or_else(|| self.interface.clone()),
        }
    }

    pub fn query_string(&self) -> Option<String> {
        match (&self.line, &self.interface) {
            (Some(line), _) => Some(format!("line={}", line)),
            (None, Some(interface)) => Some(format!("interface={}", interface)),
            (None, None) => None,
        }
    }
}

/// Outcome of looking up a parent selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentResolution {
    NotRequested,
    Resolved(ParentLink),
    /// Selector was malformed or named a missing object
    Unresolved,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct ExtensionForm {
    pub dn: String,
    #[serde(default)]
    pub partition: Option<i32>,
    #[serde(default)]
    pub status: Option<StatusValue>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub line: Option<LooseId>,
    #[serde(default)]
    pub interface: Option<LooseId>,
    /// Clear the current line/interface link on edit
    #[serde(default)]
    pub unlink: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct ExtensionBulkEdit {
    pub ids: Vec<i32>,
    pub status: Option<StatusValue>,
    pub description: Option<String>,
    #[serde(default)]
    pub nullify: Vec<BulkNullify>,
    #[serde(default)]
    pub add_tags: Vec<String>,
    #[serde(default)]
    pub remove_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct ExtensionBulkAdd {
    /// DN pattern such as `10[00-19]`
    pub pattern: String,
    #[serde(default)]
    pub partition: Option<i32>,
    #[serde(default)]
    pub status: Option<StatusValue>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct BulkAddFailure {
    pub dn: String,
    pub field: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct BulkAddResult {
    pub created: Vec<ExtensionView>,
    pub errors: Vec<BulkAddFailure>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct AssignSearch {
    /// DN prefix, matched case-insensitively
    pub dn: String,
    #[serde(default)]
    pub unassigned_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct StatusChoice {
    pub value: i32,
    pub name: ExtensionStatus,
    pub label: String,
    pub class: String,
}

impl From<ExtensionStatus> for StatusChoice {
    fn from(status: ExtensionStatus) -> Self {
        Self {
            value: status.value(),
            name: status,
            label: status.label().to_string(),
            class: status.css_class().to_string(),
        }
    }
}

/// Initial values for a new extension, with the parent pre-filled from the
/// request's selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct ExtensionDefaults {
    pub dn: String,
    pub partition: Option<i32>,
    pub status: ExtensionStatus,
    pub status_choices: Vec<StatusChoice>,
    pub parent: Option<ParentView>,
    pub enforce_global_unique: bool,
}

struct ValidatedFields {
    dn: String,
    status: ExtensionStatus,
    description: Option<String>,
    tags: String,
}

fn validate_fields(form: &ExtensionForm) -> ExtensionResult<ValidatedFields> {
    Ok(ValidatedFields {
        dn: require_text("dn", &form.dn, DN_MAX_LEN)?,
        status: match &form.status {
            Some(status) => status.resolve()?,
            None => ExtensionStatus::default(),
        },
        description: optional_field(
            "description",
            form.description.as_deref(),
            DESCRIPTION_MAX_LEN,
        )?,
        tags: tags::encode(&form.tags),
    })
}

#[derive(Clone)]
pub struct ExtensionService {
    db: DatabaseConnection,
    policy: UniquenessPolicy,
}

impl ExtensionService {
    pub fn new(db: DatabaseConnection, policy: UniquenessPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> UniquenessPolicy {
        self.policy
    }

    pub async fn list(
        &self,
        filter: &ExtensionFilter,
        limit: u64,
        offset: u64,
    ) -> ExtensionResult<Page<ExtensionView>> {
        let query = extensions::Entity::find().filter(filter.condition()?);
        let count = query.clone().count(&self.db).await?;

        let models = query
            .order_by_asc(extensions::Column::Id)
            .order_by_asc(extensions::Column::Dn)
            .order_by_asc(extensions::Column::PartitionId)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;

        let results = extension_views(&self.db, &models).await?;
        Ok(Page::new(count, limit, offset, results))
    }

    pub async fn get(&self, id: i32) -> ExtensionResult<ExtensionView> {
        let model = find_extension(&self.db, id).await?;
        self.view(model).await
    }

    pub async fn create(
        &self,
        form: ExtensionForm,
        hint: ParentHint,
    ) -> ExtensionResult<ExtensionView> {
        let txn = self.db.begin().await?;
        let model = create_in(&txn, self.policy, form, &hint).await?;
        txn.commit().await?;

        info!("Created extension {} ({})", model.dn, model.id);
        self.view(model).await
    }

    pub async fn update(
        &self,
        id: i32,
        form: ExtensionForm,
        hint: ParentHint,
    ) -> ExtensionResult<ExtensionView> {
        let fields = validate_fields(&form)?;

        let txn = self.db.begin().await?;
        let existing = find_extension(&txn, id).await?;
        let partition = load_partition(&txn, form.partition).await?;

        let requested = hint.merged(form.line.clone(), form.interface.clone());
        let current = if form.unlink { None } else { existing.parent() };
        let parent = match resolve_parent(&txn, &requested).await? {
            ParentResolution::Resolved(link) => Some(link),
            ParentResolution::NotRequested | ParentResolution::Unresolved => current,
        };

        let scope = uniqueness::check_unique(
            &txn,
            self.policy,
            &fields.dn,
            partition.as_ref(),
            Some(id),
        )
        .await?;
        let (line_id, interface_id) = ParentLink::into_columns(parent);

        let mut active: extensions::ActiveModel = existing.into();
        active.dn = Set(fields.dn.clone());
        active.partition_id = Set(partition.as_ref().map(|p| p.id));
        active.status = Set(fields.status);
        active.line_id = Set(line_id);
        active.interface_id = Set(interface_id);
        active.unique_scope = Set(scope.as_ref().map(|s| s.key()));
        active.description = Set(fields.description);
        active.tags = Set(fields.tags);
        active.updated_at = Set(Utc::now());

        let model = match active.update(&txn).await {
            Ok(model) => model,
            Err(err) if is_unique_violation(&err) => {
                return Err(
                    uniqueness::duplicate_error(&txn, scope.as_ref(), &fields.dn, Some(id)).await,
                )
            }
            Err(err) => return Err(err.into()),
        };
        ChangeLogService::record(&txn, ChangeAction::Update, changed(&model), &model).await?;
        txn.commit().await?;

        info!("Updated extension {} ({})", model.dn, model.id);
        self.view(model).await
    }

    pub async fn delete(&self, id: i32) -> ExtensionResult<()> {
        let txn = self.db.begin().await?;
        let model = find_extension(&txn, id).await?;
        extensions::Entity::delete_by_id(id).exec(&txn).await?;
        ChangeLogService::record(&txn, ChangeAction::Delete, changed(&model), &model).await?;
        txn.commit().await?;

        info!("Deleted extension {} ({})", model.dn, id);
        Ok(())
    }

    pub async fn bulk_edit(&self, edit: ExtensionBulkEdit) -> ExtensionResult<Vec<ExtensionView>> {
        let status = edit.status.as_ref().map(StatusValue::resolve).transpose()?;
        let description = optional_field(
            "description",
            edit.description.as_deref(),
            DESCRIPTION_MAX_LEN,
        )?;
        let clear_description = edit.nullify.contains(&BulkNullify::Description);

        let txn = self.db.begin().await?;
        let models = extensions::Entity::find()
            .filter(extensions::Column::Id.is_in(edit.ids.clone()))
            .order_by_asc(extensions::Column::Id)
            .all(&txn)
            .await?;

        let mut updated = Vec::with_capacity(models.len());
        for model in models {
            let tags = tags::apply_changes(&model.tags, &edit.add_tags, &edit.remove_tags);
            let current_description = model.description.clone();
            let current_status = model.status;

            let mut active: extensions::ActiveModel = model.into();
            active.status = Set(status.unwrap_or(current_status));
            active.description = Set(if clear_description {
                None
            } else {
                description.clone().or(current_description)
            });
            active.tags = Set(tags);
            active.updated_at = Set(Utc::now());

            let model = active.update(&txn).await?;
            ChangeLogService::record(&txn, ChangeAction::Update, changed(&model), &model).await?;
            updated.push(model);
        }
        txn.commit().await?;

        info!("Bulk edited {} extension(s)", updated.len());
        Ok(extension_views(&self.db, &updated).await?)
    }

    pub async fn bulk_delete(&self, ids: &[i32]) -> ExtensionResult<u64> {
        let txn = self.db.begin().await?;
        let models = extensions::Entity::find()
            .filter(extensions::Column::Id.is_in(ids.to_vec()))
            .all(&txn)
            .await?;

        for model in &models {
            extensions::Entity::delete_by_id(model.id).exec(&txn).await?;
            ChangeLogService::record(&txn, ChangeAction::Delete, changed(model), model).await?;
        }
        txn.commit().await?;

        info!("Bulk deleted {} extension(s)", models.len());
        Ok(models.len() as u64)
    }

    /// Create one extension per value of `pattern`. Each value is committed
    /// on its own, so one rejected DN does not undo the others.
    pub async fn bulk_add(&self, request: ExtensionBulkAdd) -> ExtensionResult<BulkAddResult> {
        let dns = expand_pattern(&request.pattern)
            .map_err(|err| ExtensionError::InvalidPattern(err.to_string()))?;
        load_partition(&self.db, request.partition).await?;
        if let Some(status) = &request.status {
            status.resolve()?;
        }

        let mut created = Vec::new();
        let mut errors = Vec::new();
        for dn in dns {
            let form = ExtensionForm {
                dn: dn.clone(),
                partition: request.partition,
                status: request.status.clone(),
                description: request.description.clone(),
                tags: request.tags.clone(),
                ..Default::default()
            };

            let txn = self.db.begin().await?;
            match create_in(&txn, self.policy, form, &ParentHint::default()).await {
                Ok(model) => {
                    txn.commit().await?;
                    created.push(model);
                }
                Err(err) if err.is_client_error() => {
                    txn.rollback().await?;
                    debug!("Bulk add skipped {}: {}", dn, err);
                    errors.push(BulkAddFailure {
                        dn,
                        field: err.field().map(str::to_string),
                        message: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            "Bulk add from {:?}: {} created, {} rejected",
            request.pattern,
            created.len(),
            errors.len()
        );
        Ok(BulkAddResult {
            created: extension_views(&self.db, &created).await?,
            errors,
        })
    }

    /// Prefix search backing the assign workflow.
    pub async fn search_by_prefix(
        &self,
        search: &AssignSearch,
    ) -> ExtensionResult<Vec<ExtensionView>> {
        let prefix = require_text("dn", &search.dn, DN_MAX_LEN)?;

        let mut condition = Condition::all().add(istarts_with(
            (extensions::Entity, extensions::Column::Dn),
            &prefix,
        ));
        if search.unassigned_only {
            condition = condition
                .add(extensions::Column::LineId.is_null())
                .add(extensions::Column::InterfaceId.is_null());
        }

        let models = extensions::Entity::find()
            .filter(condition)
            .order_by_asc(extensions::Column::Dn)
            .order_by_asc(extensions::Column::Id)
            .limit(ASSIGN_SEARCH_LIMIT)
            .all(&self.db)
            .await?;

        debug!("Assign search {:?} matched {} record(s)", prefix, models.len());
        Ok(extension_views(&self.db, &models).await?)
    }

    /// The parent an assign or add request targets, if the selector names one.
    pub async fn resolve_target(&self, hint: &ParentHint) -> ExtensionResult<Option<ParentView>> {
        match resolve_parent(&self.db, hint).await? {
            ParentResolution::Resolved(link) => Ok(parent_view(&self.db, link).await?),
            ParentResolution::NotRequested | ParentResolution::Unresolved => Ok(None),
        }
    }

    pub async fn add_form(&self, hint: &ParentHint) -> ExtensionResult<ExtensionDefaults> {
        Ok(ExtensionDefaults {
            dn: String::new(),
            partition: None,
            status: ExtensionStatus::default(),
            status_choices: vec![
                ExtensionStatus::Active.into(),
                ExtensionStatus::Inactive.into(),
            ],
            parent: self.resolve_target(hint).await?,
            enforce_global_unique: self.policy.enforce_global_unique,
        })
    }

    /// Resync partition-less extensions with the configured global policy.
    pub async fn apply_global_policy(&self) -> ExtensionResult<u64> {
        let txn = self.db.begin().await?;
        let synced = uniqueness::apply_global_policy(&txn, self.policy).await?;
        txn.commit().await?;
        Ok(synced)
    }

    async fn view(&self, model: extensions::Model) -> ExtensionResult<ExtensionView> {
        let id = model.id;
        extension_views(&self.db, &[model])
            .await?
            .pop()
            .ok_or(ExtensionError::NotFound(id))
    }
}

pub(crate) async fn find_extension<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> ExtensionResult<extensions::Model> {
    extensions::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(ExtensionError::NotFound(id))
}

async fn load_partition<C: ConnectionTrait>(
    conn: &C,
    partition_id: Option<i32>,
) -> ExtensionResult<Option<partitions::Model>> {
    match partition_id {
        Some(id) => partitions::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(Some)
            .ok_or(ExtensionError::PartitionNotFound(id)),
        None => Ok(None),
    }
}

/// Insert a new extension inside the caller's transaction.
pub(crate) async fn create_in<C: ConnectionTrait>(
    conn: &C,
    policy: UniquenessPolicy,
    form: ExtensionForm,
    hint: &ParentHint,
) -> ExtensionResult<extensions::Model> {
    let fields = validate_fields(&form)?;
    let partition = load_partition(conn, form.partition).await?;

    let requested = hint.merged(form.line, form.interface);
    let parent = match resolve_parent(conn, &requested).await? {
        ParentResolution::Resolved(link) => Some(link),
        ParentResolution::NotRequested | ParentResolution::Unresolved => None,
    };

    let scope = uniqueness::check_unique(conn, policy, &fields.dn, partition.as_ref(), None).await?;
    let (line_id, interface_id) = ParentLink::into_columns(parent);

    let now = Utc::now();
    let active = extensions::ActiveModel {
        dn: Set(fields.dn.clone()),
        partition_id: Set(partition.as_ref().map(|p| p.id)),
        status: Set(fields.status),
        line_id: Set(line_id),
        interface_id: Set(interface_id),
        unique_scope: Set(scope.as_ref().map(|s| s.key())),
        description: Set(fields.description),
        tags: Set(fields.tags),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = match active.insert(conn).await {
        Ok(model) => model,
        Err(err) if is_unique_violation(&err) => {
            return Err(uniqueness::duplicate_error(conn, scope.as_ref(), &fields.dn, None).await)
        }
        Err(err) => return Err(err.into()),
    };

    ChangeLogService::record(conn, ChangeAction::Create, changed(&model), &model).await?;
    Ok(model)
}

/// Look up a parent selector. Lookup failures are not errors: the caller
/// decides what an unresolved selector means.
pub async fn resolve_parent<C: ConnectionTrait>(
    conn: &C,
    hint: &ParentHint,
) -> ExtensionResult<ParentResolution> {
    let line = hint.line.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let interface = hint
        .interface
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (line, interface) {
        (Some(_), Some(_)) => Err(ExtensionError::ConflictingParent),
        (Some(raw), None) => {
            let Ok(id) = raw.parse::<i32>() else {
                debug!("Ignoring malformed line id {:?}", raw);
                return Ok(ParentResolution::Unresolved);
            };
            match lines::Entity::find_by_id(id).one(conn).await? {
                Some(line) => Ok(ParentResolution::Resolved(ParentLink::Line(line.id))),
                None => {
                    debug!("Ignoring unknown line {}", id);
                    Ok(ParentResolution::Unresolved)
                }
            }
        }
        (None, Some(raw)) => {
            let Ok(id) = raw.parse::<i32>() else {
                debug!("Ignoring malformed interface id {:?}", raw);
                return Ok(ParentResolution::Unresolved);
            };
            match interfaces::Entity::find_by_id(id).one(conn).await? {
                Some(interface) => Ok(ParentResolution::Resolved(ParentLink::Interface(
                    interface.id,
                ))),
                None => {
                    debug!("Ignoring unknown interface {}", id);
                    Ok(ParentResolution::Unresolved)
                }
            }
        }
        (None, None) => Ok(ParentResolution::NotRequested),
    }
}

async fn parent_view<C: ConnectionTrait>(
    conn: &C,
    link: ParentLink,
) -> Result<Option<ParentView>, DbErr> {
    match link {
        ParentLink::Line(id) => {
            let Some(line) = lines::Entity::find_by_id(id).one(conn).await? else {
                return Ok(None);
            };
            let device = match line.device_id {
                Some(device_id) => devices::Entity::find_by_id(device_id).one(conn).await?,
                None => None,
            };
            Ok(Some(ParentView::from_line(&line, device.as_ref())))
        }
        ParentLink::Interface(id) => {
            let Some(interface) = interfaces::Entity::find_by_id(id).one(conn).await? else {
                return Ok(None);
            };
            let device = devices::Entity::find_by_id(interface.device_id)
                .one(conn)
                .await?;
            Ok(Some(ParentView::from_interface(&interface, device.as_ref())))
        }
    }
}

/// Hydrate extensions with their partition, parent and device using one
/// query per related table.
pub(crate) async fn extension_views<C: ConnectionTrait>(
    conn: &C,
    models: &[extensions::Model],
) -> Result<Vec<ExtensionView>, DbErr> {
    let partition_ids: HashSet<i32> = models.iter().filter_map(|m| m.partition_id).collect();
    let line_ids: HashSet<i32> = models.iter().filter_map(|m| m.line_id).collect();
    let interface_ids: HashSet<i32> = models.iter().filter_map(|m| m.interface_id).collect();

    let partitions: HashMap<i32, partitions::Model> = partitions::Entity::find()
        .filter(partitions::Column::Id.is_in(partition_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let lines: HashMap<i32, lines::Model> = lines::Entity::find()
        .filter(lines::Column::Id.is_in(line_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|l| (l.id, l))
        .collect();
    let interfaces: HashMap<i32, interfaces::Model> = interfaces::Entity::find()
        .filter(interfaces::Column::Id.is_in(interface_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    let device_ids: HashSet<i32> = lines
        .values()
        .filter_map(|l| l.device_id)
        .chain(interfaces.values().map(|i| i.device_id))
        .collect();
    let devices: HashMap<i32, devices::Model> = devices::Entity::find()
        .filter(devices::Column::Id.is_in(device_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();

    Ok(models
        .iter()
        .map(|model| {
            let parent = match model.parent() {
                Some(ParentLink::Line(id)) => lines.get(&id).map(|line| {
                    ParentView::from_line(line, line.device_id.and_then(|d| devices.get(&d)))
                }),
                Some(ParentLink::Interface(id)) => interfaces.get(&id).map(|interface| {
                    ParentView::from_interface(interface, devices.get(&interface.device_id))
                }),
                None => None,
            };
            if model.parent().is_some() && parent.is_none() {
                warn!("Extension {} points at a missing parent", model.id);
            }
            ExtensionView::new(
                model,
                model.partition_id.and_then(|p| partitions.get(&p)),
                parent,
            )
        })
        .collect())
}

pub(crate) fn changed(model: &extensions::Model) -> ChangedObject<'_> {
    ChangedObject {
        object_type: "extension",
        id: model.id,
        repr: &model.dn,
        related: model.parent().map(|link| (link.kind(), link.id())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::services::dcim_service::{DcimService, DeviceForm, InterfaceForm};
    use crate::services::line_service::{LineForm, LineService};
    use crate::services::partition_service::{PartitionForm, PartitionService};

    fn form(dn: &str) -> ExtensionForm {
        ExtensionForm {
            dn: dn.to_string(),
            ..Default::default()
        }
    }

    async fn partition(db: &DatabaseConnection, name: &str, enforce_unique: bool) -> i32 {
        PartitionService::new(db.clone())
            .create(PartitionForm {
                name: name.to_string(),
                enforce_unique,
                description: None,
                tags: vec![],
            })
            .await
            .unwrap()
            .id
    }

    async fn line(db: &DatabaseConnection, device: &str, name: &str) -> (i32, i32) {
        let device = DcimService::new(db.clone())
            .create_device(DeviceForm {
                name: device.to_string(),
            })
            .await
            .unwrap();
        let line = LineService::new(db.clone())
            .create(LineForm {
                device: Some(device.id),
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        (device.id, line.id)
    }

    #[test]
    fn status_values_resolve() {
        assert_eq!(
            StatusValue::Number(2).resolve().unwrap(),
            ExtensionStatus::Inactive
        );
        assert_eq!(
            StatusValue::Text("Active".to_string()).resolve().unwrap(),
            ExtensionStatus::Active
        );
        assert!(matches!(
            StatusValue::Number(7).resolve(),
            Err(ExtensionError::InvalidStatus(_))
        ));
    }

    #[test]
    fn hint_merge_prefers_body() {
        let hint = ParentHint::line(3).merged(Some(LooseId::Number(9)), None);
        assert_eq!(hint.line.as_deref(), Some("9"));
        assert_eq!(hint.query_string().as_deref(), Some("line=9"));
        assert!(ParentHint::default().is_empty());
    }

    #[tokio::test]
    async fn duplicate_in_unique_partition_names_scope_and_record() {
        let (db, _file) = setup_test_db().await;
        let service = ExtensionService::new(db.clone(), UniquenessPolicy::default());
        let internal = partition(&db, "Internal", true).await;

        let mut first = form("1000");
        first.partition = Some(internal);
        let existing = service.create(first.clone(), ParentHint::default()).await.unwrap();

        let err = service
            .create(first, ParentHint::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Duplicate DN found in Partition Internal: 1000 (#{})", existing.id)
        );
        assert_eq!(err.field(), Some("dn"));

        // Same DN in another partition is fine.
        let other = partition(&db, "Other", true).await;
        let mut elsewhere = form("1000");
        elsewhere.partition = Some(other);
        assert!(service.create(elsewhere, ParentHint::default()).await.is_ok());
    }

    #[tokio::test]
    async fn partition_less_duplicates_follow_the_policy() {
        let (db, _file) = setup_test_db().await;
        let relaxed = ExtensionService::new(db.clone(), UniquenessPolicy::default());
        relaxed.create(form("2000"), ParentHint::default()).await.unwrap();
        relaxed.create(form("2000"), ParentHint::default()).await.unwrap();

        let (db, _file) = setup_test_db().await;
        let strict = ExtensionService::new(db, UniquenessPolicy::new(true));
        let first = strict.create(form("2000"), ParentHint::default()).await.unwrap();
        let err = strict.create(form("2000"), ParentHint::default()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Duplicate DN found in global table: 2000 (#{})", first.id)
        );
    }

    #[tokio::test]
    async fn unknown_parent_on_edit_keeps_link() {
        let (db, _file) = setup_test_db().await;
        let service = ExtensionService::new(db.clone(), UniquenessPolicy::default());
        let (device_id, line_id) = line(&db, "phone-01", "L1").await;

        let created = service
            .create(form("3000"), ParentHint::line(line_id))
            .await
            .unwrap();
        assert_eq!(created.device.as_ref().map(|d| d.id), Some(device_id));

        let edited = service
            .update(created.id, form("3000"), ParentHint::line(9999))
            .await
            .unwrap();
        assert!(matches!(edited.parent, Some(ParentView::Line { id, .. }) if id == line_id));

        let malformed = service
            .update(created.id, form("3000"), ParentHint {
                line: Some("abc".to_string()),
                interface: None,
            })
            .await
            .unwrap();
        assert!(malformed.parent.is_some());

        let mut unlink = form("3000");
        unlink.unlink = true;
        let cleared = service
            .update(created.id, unlink, ParentHint::default())
            .await
            .unwrap();
        assert!(cleared.parent.is_none());
        assert!(cleared.device.is_none());
    }

    #[tokio::test]
    async fn unknown_parent_on_create_leaves_unlinked() {
        let (db, _file) = setup_test_db().await;
        let service = ExtensionService::new(db, UniquenessPolicy::default());

        let created = service
            .create(form("3100"), ParentHint::interface(42))
            .await
            .unwrap();
        assert!(created.parent.is_none());
    }

    #[tokio::test]
    async fn both_parents_is_an_error() {
        let (db, _file) = setup_test_db().await;
        let service = ExtensionService::new(db, UniquenessPolicy::default());

        let mut both = form("3200");
        both.interface = Some(LooseId::Number(1));
        let err = service
            .create(both, ParentHint::line(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtensionError::ConflictingParent));
    }

    #[tokio::test]
    async fn reassigning_to_an_interface_replaces_the_line() {
        let (db, _file) = setup_test_db().await;
        let service = ExtensionService::new(db.clone(), UniquenessPolicy::default());
        let (device_id, line_id) = line(&db, "phone-02", "L1").await;
        let interface = DcimService::new(db.clone())
            .create_interface(device_id, InterfaceForm {
                name: "eth0".to_string(),
            })
            .await
            .unwrap();

        let created = service
            .create(form("3300"), ParentHint::line(line_id))
            .await
            .unwrap();
        let moved = service
            .update(created.id, form("3300"), ParentHint::interface(interface.id))
            .await
            .unwrap();

        assert!(matches!(
            moved.parent,
            Some(ParentView::Interface { id, .. }) if id == interface.id
        ));
        let stored = find_extension(&db, created.id).await.unwrap();
        assert_eq!((stored.line_id, stored.interface_id), (None, Some(interface.id)));
    }

    #[tokio::test]
    async fn bulk_add_reports_per_dn_errors() {
        let (db, _file) = setup_test_db().await;
        let service = ExtensionService::new(db.clone(), UniquenessPolicy::default());
        let internal = partition(&db, "Internal", true).await;

        let mut existing = form("4001");
        existing.partition = Some(internal);
        service.create(existing, ParentHint::default()).await.unwrap();

        let result = service
            .bulk_add(ExtensionBulkAdd {
                pattern: "400[0-2]".to_string(),
                partition: Some(internal),
                ..Default::default()
            })
            .await
            .unwrap();

        let created: Vec<&str> = result.created.iter().map(|e| e.dn.as_str()).collect();
        assert_eq!(created, vec!["4000", "4002"]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].dn, "4001");
        assert_eq!(result.errors[0].field.as_deref(), Some("dn"));

        let err = service
            .bulk_add(ExtensionBulkAdd {
                pattern: "[9-1]".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("pattern"));
    }

    #[tokio::test]
    async fn bulk_add_with_unclosed_bracket_saves_nothing() {
        let (db, _file) = setup_test_db().await;
        let service = ExtensionService::new(db.clone(), UniquenessPolicy::default());

        for pattern in ["10[9-", "10[0-2", "10]"] {
            let err = service
                .bulk_add(ExtensionBulkAdd {
                    pattern: pattern.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap_err();
            assert!(matches!(err, ExtensionError::InvalidPattern(_)), "{}", pattern);
            assert!(err.is_client_error());
        }

        assert_eq!(extensions::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn prefix_search_is_case_insensitive_and_limited() {
        let (db, _file) = setup_test_db().await;
        let service = ExtensionService::new(db.clone(), UniquenessPolicy::default());

        service
            .bulk_add(ExtensionBulkAdd {
                pattern: "123[000-104]".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        service.create(form("9123"), ParentHint::default()).await.unwrap();
        service.create(form("SIP-a"), ParentHint::default()).await.unwrap();

        let results = service
            .search_by_prefix(&AssignSearch {
                dn: "123".to_string(),
                unassigned_only: false,
            })
            .await
            .unwrap();
        assert_eq!(results.len(), ASSIGN_SEARCH_LIMIT as usize);
        assert!(results.iter().all(|e| e.dn.starts_with("123")));

        let sip = service
            .search_by_prefix(&AssignSearch {
                dn: "sip".to_string(),
                unassigned_only: true,
            })
            .await
            .unwrap();
        assert_eq!(sip.len(), 1);

        let err = service
            .search_by_prefix(&AssignSearch::default())
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("dn"));
    }

    #[tokio::test]
    async fn concurrent_creates_yield_one_record() {
        let (db, _file) = setup_test_db().await;
        let service = ExtensionService::new(db.clone(), UniquenessPolicy::default());
        let internal = partition(&db, "Internal", true).await;

        let mut request = form("5000");
        request.partition = Some(internal);
        let (a, b) = tokio::join!(
            service.create(request.clone(), ParentHint::default()),
            service.create(request.clone(), ParentHint::default())
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let stored = extensions::Entity::find()
            .filter(extensions::Column::Dn.eq("5000"))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(stored, 1);
    }

    #[tokio::test]
    async fn changes_are_logged() {
        let (db, _file) = setup_test_db().await;
        let service = ExtensionService::new(db.clone(), UniquenessPolicy::default());

        let created = service.create(form("6000"), ParentHint::default()).await.unwrap();
        service.delete(created.id).await.unwrap();

        let changes = ChangeLogService::new(db)
            .list_for("extension", created.id)
            .await
            .unwrap();
        let actions: Vec<&str> = changes.iter().map(|c| c.action.as_str()).collect();
        assert_eq!(actions, vec!["delete", "create"]);
    }
}
