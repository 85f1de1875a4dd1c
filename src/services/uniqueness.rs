//! DN uniqueness rules.
//!
//! An extension's uniqueness scope follows from its partition and the global
//! policy:
//!
//! - in a partition with `enforce_unique`, the DN must be unique within that
//!   partition;
//! - in a partition without it, nothing is checked;
//! - without a partition, the DN must be unique among other partition-less
//!   extensions only when the global policy asks for it.
//!
//! The resolved scope is persisted in `extensions.unique_scope`, which carries
//! a unique index together with `dn`. The pre-insert lookup produces a helpful
//! message; the index guarantees the rule under concurrent writers.

use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::database::entities::{extensions, partitions};
use crate::errors::{ExtensionError, ExtensionResult, ValidationError};

pub const GLOBAL_SCOPE_KEY: &str = "global";

/// Deployment-wide uniqueness switch for partition-less extensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniquenessPolicy {
    pub enforce_global_unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueScope {
    Partition { id: i32, name: String },
    Global,
}

impl UniqueScope {
    pub fn partition_key(id: i32) -> String {
        format!("partition:{}", id)
    }

    /// Value stored in `extensions.unique_scope`
    pub fn key(&self) -> String {
        match self {
            UniqueScope::Partition { id, .. } => Self::partition_key(*id),
            UniqueScope::Global => GLOBAL_SCOPE_KEY.to_string(),
        }
    }

    /// Scope as it appears in duplicate messages
    pub fn describe(&self) -> String {
        match self {
            UniqueScope::Partition { name, .. } => format!("Partition {}", name),
            UniqueScope::Global => "global table".to_string(),
        }
    }
}

impl UniquenessPolicy {
    pub fn new(enforce_global_unique: bool) -> Self {
        Self {
            enforce_global_unique,
        }
    }

    pub fn scope_for(&self, partition: Option<&partitions::Model>) -> Option<UniqueScope> {
        match partition {
            Some(p) if p.enforce_unique => Some(UniqueScope::Partition {
                id: p.id,
                name: p.name.clone(),
            }),
            Some(_) => None,
            None if self.enforce_global_unique => Some(UniqueScope::Global),
            None => None,
        }
    }
}

/// Lowest-id extension other than `exclude_id` holding `dn` in `scope`.
pub async fn find_duplicate<C: ConnectionTrait>(
    conn: &C,
    scope: &UniqueScope,
    dn: &str,
    exclude_id: Option<i32>,
) -> Result<Option<extensions::Model>, DbErr> {
    let scope_filter = match scope {
        UniqueScope::Partition { id, .. } => extensions::Column::PartitionId.eq(*id),
        UniqueScope::Global => extensions::Column::PartitionId.is_null(),
    };

    let mut condition = Condition::all()
        .add(extensions::Column::Dn.eq(dn))
        .add(scope_filter);
    if let Some(id) = exclude_id {
        condition = condition.add(extensions::Column::Id.ne(id));
    }

    extensions::Entity::find()
        .filter(condition)
        .order_by_asc(extensions::Column::Id)
        .one(conn)
        .await
}

/// Resolve the scope for `dn` and reject it if another record already holds
/// the DN there. Returns the scope to persist with the record.
pub async fn check_unique<C: ConnectionTrait>(
    conn: &C,
    policy: UniquenessPolicy,
    dn: &str,
    partition: Option<&partitions::Model>,
    exclude_id: Option<i32>,
) -> ExtensionResult<Option<UniqueScope>> {
    let scope = policy.scope_for(partition);

    let Some(scope) = scope else {
        return Ok(None);
    };
    if dn.is_empty() {
        return Ok(Some(scope));
    }

    if let Some(conflict) = find_duplicate(conn, &scope, dn, exclude_id).await? {
        debug!("DN {} conflicts with extension {}", dn, conflict.id);
        return Err(ExtensionError::Duplicate {
            scope: scope.describe(),
            dn: conflict.dn,
            conflict_id: conflict.id,
        });
    }

    Ok(Some(scope))
}

/// Turn a unique-index violation on `(unique_scope, dn)` into the same error
/// the pre-insert check would have produced. When the holder cannot be found
/// again the message names the scope but no record.
pub async fn duplicate_error<C: ConnectionTrait>(
    conn: &C,
    scope: Option<&UniqueScope>,
    dn: &str,
    exclude_id: Option<i32>,
) -> ExtensionError {
    let Some(scope) = scope else {
        return ValidationError::field("dn", format!("Duplicate DN: {}", dn)).into();
    };

    match find_duplicate(conn, scope, dn, exclude_id).await {
        Ok(Some(conflict)) => ExtensionError::Duplicate {
            scope: scope.describe(),
            dn: conflict.dn,
            conflict_id: conflict.id,
        },
        Ok(None) => ValidationError::field(
            "dn",
            format!("Duplicate DN found in {}: {}", scope.describe(), dn),
        )
        .into(),
        Err(err) => ExtensionError::Database(err),
    }
}

/// DNs held by more than one extension in a partition (or among
/// partition-less extensions when `partition_id` is `None`).
pub async fn duplicate_dns<C: ConnectionTrait>(
    conn: &C,
    partition_id: Option<i32>,
) -> Result<Vec<String>, DbErr> {
    let scope_filter = match partition_id {
        Some(id) => extensions::Column::PartitionId.eq(id),
        None => extensions::Column::PartitionId.is_null(),
    };

    extensions::Entity::find()
        .select_only()
        .column(extensions::Column::Dn)
        .filter(scope_filter)
        .group_by(extensions::Column::Dn)
        .having(Expr::expr(Func::count(Expr::col(extensions::Column::Id))).gt(1))
        .order_by_asc(extensions::Column::Dn)
        .into_tuple::<String>()
        .all(conn)
        .await
}

/// Rewrite the stored scope of every extension in `partition`.
pub async fn sync_partition_scope<C: ConnectionTrait>(
    conn: &C,
    partition: &partitions::Model,
) -> Result<u64, DbErr> {
    let scope = partition
        .enforce_unique
        .then(|| UniqueScope::partition_key(partition.id));

    let result = extensions::Entity::update_many()
        .col_expr(extensions::Column::UniqueScope, Expr::value(scope))
        .filter(extensions::Column::PartitionId.eq(partition.id))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// Align partition-less extensions with the global policy. Fails without
/// changes when the policy is on and duplicates already exist.
pub async fn apply_global_policy<C: ConnectionTrait>(
    conn: &C,
    policy: UniquenessPolicy,
) -> ExtensionResult<u64> {
    if policy.enforce_global_unique {
        let dns = duplicate_dns(conn, None).await?;
        if !dns.is_empty() {
            return Err(ExtensionError::GlobalDuplicates(dns));
        }
    }

    let scope = policy
        .enforce_global_unique
        .then(|| GLOBAL_SCOPE_KEY.to_string());

    let result = extensions::Entity::update_many()
        .col_expr(extensions::Column::UniqueScope, Expr::value(scope))
        .filter(extensions::Column::PartitionId.is_null())
        .exec(conn)
        .await?;

    info!(
        "Global DN uniqueness {}; {} partition-less extension(s) resynced",
        if policy.enforce_global_unique { "enforced" } else { "off" },
        result.rows_affected
    );
    Ok(result.rows_affected)
}
