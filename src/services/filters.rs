//! List query parameters.
//!
//! Multi-valued filters take comma separated values (`?status=1,2`), and
//! `partition_id` accepts `null` to select partition-less extensions.

use sea_orm::sea_query::{Expr, Func, Iden, LikeExpr, Query, SimpleExpr};
use sea_orm::{ColumnTrait, Condition};
use serde::Deserialize;

use crate::config::PaginationConfig;
use crate::database::entities::extensions::ExtensionStatus;
use crate::database::entities::{extensions, interfaces, lines, partitions};
use crate::errors::ValidationError;

use super::tags;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "server", into_params(parameter_in = Query))]
pub struct PageParams {
    /// Page size; defaults to the configured page size
    pub limit: Option<u64>,
    /// Number of records to skip
    pub offset: Option<u64>,
}

impl PageParams {
    /// Clamp against the configured default and maximum page size.
    pub fn resolve(&self, config: &PaginationConfig) -> (u64, u64) {
        let limit = match self.limit {
            Some(0) | None => config.default_limit,
            Some(limit) => limit.min(config.max_limit),
        };
        (limit, self.offset.unwrap_or(0))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "server", into_params(parameter_in = Query))]
pub struct PartitionFilter {
    /// Free text search over name and description
    pub q: Option<String>,
    pub name: Option<String>,
    pub enforce_unique: Option<bool>,
    pub tag: Option<String>,
    #[serde(rename = "id__in")]
    pub id_in: Option<String>,
}

impl PartitionFilter {
    pub fn condition(&self) -> Result<Condition, ValidationError> {
        let mut condition = Condition::all();

        if let Some(q) = non_empty(&self.q) {
            condition = condition.add(
                Condition::any()
                    .add(icontains((partitions::Entity, partitions::Column::Name), q))
                    .add(icontains(
                        (partitions::Entity, partitions::Column::Description),
                        q,
                    )),
            );
        }
        if let Some(names) = non_empty(&self.name) {
            condition = condition.add(partitions::Column::Name.is_in(split_list(names)));
        }
        if let Some(enforce_unique) = self.enforce_unique {
            condition = condition.add(partitions::Column::EnforceUnique.eq(enforce_unique));
        }
        if let Some(tag) = non_empty(&self.tag) {
            condition = condition.add(tag_filter(
                (partitions::Entity, partitions::Column::Tags),
                tag,
            ));
        }
        if let Some(ids) = non_empty(&self.id_in) {
            condition = condition.add(partitions::Column::Id.is_in(parse_ids("id__in", ids)?));
        }

        Ok(condition)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "server", into_params(parameter_in = Query))]
pub struct ExtensionFilter {
    /// Free text search: DN prefix or description substring
    pub q: Option<String>,
    pub dn: Option<String>,
    /// Partition IDs; `null` selects extensions without a partition
    pub partition_id: Option<String>,
    pub status: Option<String>,
    pub line_id: Option<String>,
    pub interface_id: Option<String>,
    /// Extensions whose line or interface belongs to these devices
    pub device_id: Option<String>,
    /// `true` for extensions with no line or interface
    pub unassigned: Option<bool>,
    pub tag: Option<String>,
    #[serde(rename = "id__in")]
    pub id_in: Option<String>,
}

impl ExtensionFilter {
    pub fn condition(&self) -> Result<Condition, ValidationError> {
        let mut condition = Condition::all();

        if let Some(q) = non_empty(&self.q) {
            condition = condition.add(
                Condition::any()
                    .add(istarts_with((extensions::Entity, extensions::Column::Dn), q))
                    .add(icontains(
                        (extensions::Entity, extensions::Column::Description),
                        q,
                    )),
            );
        }
        if let Some(dns) = non_empty(&self.dn) {
            condition = condition.add(extensions::Column::Dn.is_in(split_list(dns)));
        }
        if let Some(raw) = non_empty(&self.partition_id) {
            condition = condition.add(nullable_id_filter(
                "partition_id",
                raw,
                extensions::Column::PartitionId,
            )?);
        }
        if let Some(raw) = non_empty(&self.status) {
            let statuses = split_list(raw)
                .into_iter()
                .map(|value| {
                    value.parse::<ExtensionStatus>().map_err(|_| {
                        ValidationError::field(
                            "status",
                            format!(
                                "Select a valid choice. {} is not one of the available choices.",
                                value
                            ),
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            condition = condition.add(extensions::Column::Status.is_in(statuses));
        }
        if let Some(raw) = non_empty(&self.line_id) {
            condition = condition.add(nullable_id_filter(
                "line_id",
                raw,
                extensions::Column::LineId,
            )?);
        }
        if let Some(raw) = non_empty(&self.interface_id) {
            condition = condition.add(nullable_id_filter(
                "interface_id",
                raw,
                extensions::Column::InterfaceId,
            )?);
        }
        if let Some(raw) = non_empty(&self.device_id) {
            let ids = parse_ids("device_id", raw)?;
            condition = condition.add(
                Condition::any()
                    .add(
                        extensions::Column::LineId.in_subquery(
                            Query::select()
                                .column(lines::Column::Id)
                                .from(lines::Entity)
                                .and_where(lines::Column::DeviceId.is_in(ids.clone()))
                                .to_owned(),
                        ),
                    )
                    .add(
                        extensions::Column::InterfaceId.in_subquery(
                            Query::select()
                                .column(interfaces::Column::Id)
                                .from(interfaces::Entity)
                                .and_where(interfaces::Column::DeviceId.is_in(ids))
                                .to_owned(),
                        ),
                    ),
            );
        }
        match self.unassigned {
            Some(true) => {
                condition = condition
                    .add(extensions::Column::LineId.is_null())
                    .add(extensions::Column::InterfaceId.is_null());
            }
            Some(false) => {
                condition = condition.add(
                    Condition::any()
                        .add(extensions::Column::LineId.is_not_null())
                        .add(extensions::Column::InterfaceId.is_not_null()),
                );
            }
            None => {}
        }
        if let Some(tag) = non_empty(&self.tag) {
            condition = condition.add(tag_filter(
                (extensions::Entity, extensions::Column::Tags),
                tag,
            ));
        }
        if let Some(ids) = non_empty(&self.id_in) {
            condition = condition.add(extensions::Column::Id.is_in(parse_ids("id__in", ids)?));
        }

        Ok(condition)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "server", into_params(parameter_in = Query))]
pub struct LineFilter {
    /// Free text search over name and description
    pub q: Option<String>,
    pub name: Option<String>,
    pub device_id: Option<String>,
    pub tag: Option<String>,
    #[serde(rename = "id__in")]
    pub id_in: Option<String>,
}

impl LineFilter {
    pub fn condition(&self) -> Result<Condition, ValidationError> {
        let mut condition = Condition::all();

        if let Some(q) = non_empty(&self.q) {
            condition = condition.add(
                Condition::any()
                    .add(icontains((lines::Entity, lines::Column::Name), q))
                    .add(icontains((lines::Entity, lines::Column::Description), q)),
            );
        }
        if let Some(names) = non_empty(&self.name) {
            condition = condition.add(lines::Column::Name.is_in(split_list(names)));
        }
        if let Some(raw) = non_empty(&self.device_id) {
            condition = condition.add(nullable_id_filter(
                "device_id",
                raw,
                lines::Column::DeviceId,
            )?);
        }
        if let Some(tag) = non_empty(&self.tag) {
            condition = condition.add(tag_filter((lines::Entity, lines::Column::Tags), tag));
        }
        if let Some(ids) = non_empty(&self.id_in) {
            condition = condition.add(lines::Column::Id.is_in(parse_ids("id__in", ids)?));
        }

        Ok(condition)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn parse_ids(field: &str, raw: &str) -> Result<Vec<i32>, ValidationError> {
    split_list(raw)
        .into_iter()
        .map(|value| {
            value.parse::<i32>().map_err(|_| {
                ValidationError::field(field, format!("'{}' is not a valid ID", value))
            })
        })
        .collect()
}

/// `col IN (...)`, with `null` in the list adding `OR col IS NULL`.
fn nullable_id_filter<C: ColumnTrait>(
    field: &str,
    raw: &str,
    column: C,
) -> Result<Condition, ValidationError> {
    let values = split_list(raw);
    let wants_null = values.iter().any(|v| v.eq_ignore_ascii_case("null"));
    let ids = values
        .iter()
        .filter(|v| !v.eq_ignore_ascii_case("null"))
        .map(|value| {
            value.parse::<i32>().map_err(|_| {
                ValidationError::field(field, format!("'{}' is not a valid ID", value))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut condition = Condition::any();
    if !ids.is_empty() {
        condition = condition.add(column.is_in(ids));
    }
    if wants_null {
        condition = condition.add(column.is_null());
    }
    Ok(condition)
}

pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive `LIKE 'value%'`
pub(crate) fn istarts_with<T, C>(column: (T, C), value: &str) -> SimpleExpr
where
    T: Iden + 'static,
    C: Iden + 'static,
{
    lower(column).like(
        LikeExpr::new(format!("{}%", escape_like(&value.to_lowercase()))).escape('\\'),
    )
}

/// Case-insensitive `LIKE '%value%'`
pub(crate) fn icontains<T, C>(column: (T, C), value: &str) -> SimpleExpr
where
    T: Iden + 'static,
    C: Iden + 'static,
{
    lower(column).like(
        LikeExpr::new(format!("%{}%", escape_like(&value.to_lowercase()))).escape('\\'),
    )
}

fn lower<T, C>(column: (T, C)) -> Expr
where
    T: Iden + 'static,
    C: Iden + 'static,
{
    Expr::expr(Func::lower(Expr::col(column)))
}

fn tag_filter<T, C>(column: (T, C), tag: &str) -> SimpleExpr
where
    T: Iden + 'static,
    C: Iden + 'static,
{
    Expr::col(column).like(LikeExpr::new(tags::like_pattern(tag)).escape('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

    fn sql(condition: Condition) -> String {
        extensions::Entity::find()
            .filter(condition)
            .build(DbBackend::Sqlite)
            .to_string()
    }

    #[test]
    fn page_params_clamp() {
        let config = PaginationConfig::default();
        assert_eq!(PageParams::default().resolve(&config), (50, 0));
        assert_eq!(
            PageParams {
                limit: Some(5000),
                offset: Some(10)
            }
            .resolve(&config),
            (1000, 10)
        );
    }

    #[test]
    fn partition_null_filter() {
        let filter = ExtensionFilter {
            partition_id: Some("3,null".to_string()),
            ..Default::default()
        };
        let query = sql(filter.condition().unwrap());
        assert!(query.contains(r#""partition_id" IN (3)"#));
        assert!(query.contains(r#""partition_id" IS NULL"#));
    }

    #[test]
    fn status_accepts_labels_and_values() {
        let filter = ExtensionFilter {
            status: Some("Active,2".to_string()),
            ..Default::default()
        };
        assert!(sql(filter.condition().unwrap()).contains(r#""status" IN (1, 2)"#));

        let bad = ExtensionFilter {
            status: Some("retired".to_string()),
            ..Default::default()
        };
        assert_eq!(bad.condition().unwrap_err().field.as_deref(), Some("status"));
    }

    #[test]
    fn bad_ids_are_rejected() {
        let filter = ExtensionFilter {
            id_in: Some("1,x".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.condition().unwrap_err().field.as_deref(), Some("id__in"));
    }

    #[test]
    fn like_values_are_escaped() {
        assert_eq!(escape_like("10%_a\\"), "10\\%\\_a\\\\");
    }
}
