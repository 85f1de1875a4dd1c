use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

#[cfg(feature = "server")]
use utoipa::ToSchema;

use crate::database::entities::{extensions, partitions};
use crate::errors::validation::{optional_field, require_text};
use crate::errors::{PartitionError, PartitionResult};

use super::changelog_service::{ChangeAction, ChangeLogService, ChangedObject};
use super::filters::PartitionFilter;
use super::uniqueness;
use super::views::{Page, PartitionView};
use super::{tags, BulkNullify};

pub const NAME_MAX_LEN: usize = 50;
pub const DESCRIPTION_MAX_LEN: usize = 100;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct PartitionForm {
    pub name: String,
    #[serde(default = "default_true")]
    pub enforce_unique: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
pub struct PartitionBulkEdit {
    pub ids: Vec<i32>,
    pub enforce_unique: Option<bool>,
    pub description: Option<String>,
    /// Fields to clear; only `description` is nullable
    #[serde(default)]
    pub nullify: Vec<BulkNullify>,
    #[serde(default)]
    pub add_tags: Vec<String>,
    #[serde(default)]
    pub remove_tags: Vec<String>,
}

struct PartitionChanges {
    name: String,
    enforce_unique: bool,
    description: Option<String>,
    tags: String,
}

#[derive(Clone)]
pub struct PartitionService {
    db: DatabaseConnection,
}

impl PartitionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: &PartitionFilter,
        limit: u64,
        offset: u64,
    ) -> PartitionResult<Page<PartitionView>> {
        let query = partitions::Entity::find().filter(filter.condition()?);
        let count = query.clone().count(&self.db).await?;

        let models = query
            .order_by_asc(partitions::Column::Name)
            .order_by_asc(partitions::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;

        let results = self.with_counts(models).await?;
        Ok(Page::new(count, limit, offset, results))
    }

    pub async fn get(&self, id: i32) -> PartitionResult<PartitionView> {
        let model = find_partition(&self.db, id).await?;
        let mut views = self.with_counts(vec![model]).await?;
        views.pop().ok_or(PartitionError::NotFound(id))
    }

    pub async fn create(&self, form: PartitionForm) -> PartitionResult<PartitionView> {
        let txn = self.db.begin().await?;
        let partition = create_in(&txn, form).await?;
        txn.commit().await?;

        info!("Created partition {} ({})", partition.name, partition.id);
        Ok(PartitionView::new(&partition, 0))
    }

    pub async fn update(&self, id: i32, form: PartitionForm) -> PartitionResult<PartitionView> {
        let changes = PartitionChanges {
            name: require_text("name", &form.name, NAME_MAX_LEN)?,
            enforce_unique: form.enforce_unique,
            description: optional_field(
                "description",
                form.description.as_deref(),
                DESCRIPTION_MAX_LEN,
            )?,
            tags: tags::encode(&form.tags),
        };

        let txn = self.db.begin().await?;
        let existing = find_partition(&txn, id).await?;
        let partition = save(&txn, existing, changes).await?;
        txn.commit().await?;

        info!("Updated partition {} ({})", partition.name, partition.id);
        self.get(partition.id).await
    }

    /// Partitions are protected while any extension references them.
    pub async fn delete(&self, id: i32) -> PartitionResult<()> {
        let txn = self.db.begin().await?;
        let partition = find_partition(&txn, id).await?;
        delete_in(&txn, partition).await?;
        txn.commit().await?;

        info!("Deleted partition {}", id);
        Ok(())
    }

    pub async fn bulk_edit(&self, edit: PartitionBulkEdit) -> PartitionResult<Vec<PartitionView>> {
        let description = optional_field(
            "description",
            edit.description.as_deref(),
            DESCRIPTION_MAX_LEN,
        )?;
        let clear_description = edit.nullify.contains(&BulkNullify::Description);

        let txn = self.db.begin().await?;
        let models = partitions::Entity::find()
            .filter(partitions::Column::Id.is_in(edit.ids.clone()))
            .order_by_asc(partitions::Column::Id)
            .all(&txn)
            .await?;

        let mut ids = Vec::with_capacity(models.len());
        for model in models {
            let changes = PartitionChanges {
                name: model.name.clone(),
                enforce_unique: edit.enforce_unique.unwrap_or(model.enforce_unique),
                description: if clear_description {
                    None
                } else {
                    description.clone().or_else(|| model.description.clone())
                },
                tags: tags::apply_changes(&model.tags, &edit.add_tags, &edit.remove_tags),
            };
            ids.push(save(&txn, model, changes).await?.id);
        }
        txn.commit().await?;

        info!("Bulk edited {} partition(s)", ids.len());
        let updated = partitions::Entity::find()
            .filter(partitions::Column::Id.is_in(ids))
            .order_by_asc(partitions::Column::Name)
            .all(&self.db)
            .await?;
        self.with_counts(updated).await
    }

    /// All or nothing: one protected partition aborts the whole batch.
    pub async fn bulk_delete(&self, ids: &[i32]) -> PartitionResult<u64> {
        let txn = self.db.begin().await?;
        let models = partitions::Entity::find()
            .filter(partitions::Column::Id.is_in(ids.to_vec()))
            .all(&txn)
            .await?;

        let mut deleted = 0;
        for model in models {
            delete_in(&txn, model).await?;
            deleted += 1;
        }
        txn.commit().await?;

        info!("Bulk deleted {} partition(s)", deleted);
        Ok(deleted)
    }

    async fn with_counts(
        &self,
        models: Vec<partitions::Model>,
    ) -> PartitionResult<Vec<PartitionView>> {
        let ids: Vec<i32> = models.iter().map(|p| p.id).collect();
        let counts: HashMap<i32, i64> = extensions::Entity::find()
            .select_only()
            .column(extensions::Column::PartitionId)
            .column_as(Expr::expr(Func::count(Expr::col(extensions::Column::Id))), "count")
            .filter(extensions::Column::PartitionId.is_in(ids))
            .group_by(extensions::Column::PartitionId)
            .into_tuple::<(i32, i64)>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();

        Ok(models
            .iter()
            .map(|p| {
                let count = counts.get(&p.id).copied().unwrap_or(0);
                PartitionView::new(p, count.max(0) as u64)
            })
            .collect())
    }
}

pub(crate) async fn find_partition<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> PartitionResult<partitions::Model> {
    partitions::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(PartitionError::NotFound(id))
}

pub(crate) async fn create_in<C: ConnectionTrait>(
    conn: &C,
    form: PartitionForm,
) -> PartitionResult<partitions::Model> {
    let name = require_text("name", &form.name, NAME_MAX_LEN)?;
    let description = optional_field(
        "description",
        form.description.as_deref(),
        DESCRIPTION_MAX_LEN,
    )?;

    let now = Utc::now();
    let partition = partitions::ActiveModel {
        name: Set(name),
        enforce_unique: Set(form.enforce_unique),
        description: Set(description),
        tags: Set(tags::encode(&form.tags)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    ChangeLogService::record(conn, ChangeAction::Create, changed(&partition), &partition).await?;
    Ok(partition)
}

/// Persist `changes`, refusing to switch uniqueness on over existing
/// duplicates and resyncing member scopes when the flag flips.
async fn save<C: ConnectionTrait>(
    conn: &C,
    existing: partitions::Model,
    changes: PartitionChanges,
) -> PartitionResult<partitions::Model> {
    let flag_changed = existing.enforce_unique != changes.enforce_unique;

    if flag_changed && changes.enforce_unique {
        let dns = uniqueness::duplicate_dns(conn, Some(existing.id)).await?;
        if !dns.is_empty() {
            return Err(PartitionError::DuplicatesPresent {
                name: existing.name,
                dns,
            });
        }
    }

    let mut active: partitions::ActiveModel = existing.into();
    active.name = Set(changes.name);
    active.enforce_unique = Set(changes.enforce_unique);
    active.description = Set(changes.description);
    active.tags = Set(changes.tags);
    active.updated_at = Set(Utc::now());
    let partition = active.update(conn).await?;

    if flag_changed {
        let synced = uniqueness::sync_partition_scope(conn, &partition).await?;
        info!(
            "Partition {} uniqueness {}; {} extension(s) resynced",
            partition.name,
            if partition.enforce_unique { "enforced" } else { "relaxed" },
            synced
        );
    }

    ChangeLogService::record(conn, ChangeAction::Update, changed(&partition), &partition).await?;
    Ok(partition)
}

async fn delete_in<C: ConnectionTrait>(
    conn: &C,
    partition: partitions::Model,
) -> PartitionResult<()> {
    let count = extensions::Entity::find()
        .filter(extensions::Column::PartitionId.eq(partition.id))
        .count(conn)
        .await?;
    if count > 0 {
        return Err(PartitionError::InUse {
            name: partition.name,
            count,
        });
    }

    partitions::Entity::delete_by_id(partition.id).exec(conn).await?;
    ChangeLogService::record(conn, ChangeAction::Delete, changed(&partition), &partition).await?;
    Ok(())
}

fn changed(partition: &partitions::Model) -> ChangedObject<'_> {
    ChangedObject {
        object_type: "partition",
        id: partition.id,
        repr: &partition.name,
        related: None,
    }
}
