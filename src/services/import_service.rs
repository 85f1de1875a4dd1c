//! CSV bulk import.
//!
//! Every row of a file is validated and written inside one transaction. If
//! any row fails, the transaction is dropped and the caller gets the full
//! list of row errors; nothing is saved.

use csv::{ReaderBuilder, Trim};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, TransactionTrait,
};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{info, warn};

use crate::database::entities::{devices, lines, partitions};
use crate::errors::{
    ExtensionError, ImportExportError, ImportExportResult, LineError, PartitionError, RowError,
};

use super::extension_service::{self, ExtensionForm, ParentHint, StatusValue};
use super::line_service::{self, LineForm};
use super::partition_service::{self, PartitionForm};
use super::uniqueness::UniquenessPolicy;
use super::views::{ExtensionView, LineView, PartitionView};

pub const PARTITION_HEADERS: &[&str] = &["name", "enforce_unique", "description"];
pub const EXTENSION_HEADERS: &[&str] = &[
    "dn",
    "partition",
    "status",
    "device",
    "line_name",
    "description",
];
pub const LINE_HEADERS: &[&str] = &["device", "name", "description"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportTarget {
    Partitions,
    Extensions,
    Lines,
}

impl FromStr for ImportTarget {
    type Err = ImportExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "partitions" | "partition" => Ok(ImportTarget::Partitions),
            "extensions" | "extension" => Ok(ImportTarget::Extensions),
            "lines" | "line" => Ok(ImportTarget::Lines),
            other => Err(ImportExportError::UnsupportedTarget(other.to_string())),
        }
    }
}

/// One data row; `number` is 1-based, not counting the header.
struct CsvRow {
    number: usize,
    values: HashMap<String, String>,
}

impl CsvRow {
    fn get(&self, field: &str) -> Option<&str> {
        self.values
            .get(field)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

fn read_rows(data: &str, allowed: &[&str], required: &[&str]) -> ImportExportResult<Vec<CsvRow>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    if let Some(unexpected) = headers.iter().find(|h| !allowed.contains(&h.as_str())) {
        return Err(ImportExportError::UnexpectedHeader(unexpected.clone()));
    }
    if let Some(missing) = required.iter().find(|r| !headers.iter().any(|h| h == *r)) {
        return Err(ImportExportError::MissingHeader(missing.to_string()));
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let values = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(CsvRow {
            number: index + 1,
            values,
        });
    }

    if rows.is_empty() {
        return Err(ImportExportError::Empty);
    }
    Ok(rows)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn partition_row_error(row: usize, err: PartitionError) -> ImportExportResult<RowError> {
    match err {
        PartitionError::Database(err) => Err(err.into()),
        PartitionError::Validation(v) => Ok(RowError::new(row, v.field.as_deref(), v.message)),
        other => Ok(RowError::new(row, other.field(), other.to_string())),
    }
}

fn extension_row_error(row: usize, err: ExtensionError) -> ImportExportResult<RowError> {
    match err {
        ExtensionError::Database(err) => Err(err.into()),
        ExtensionError::Validation(v) => Ok(RowError::new(row, v.field.as_deref(), v.message)),
        ExtensionError::InvalidStatus(value) => Ok(RowError::new(
            row,
            Some("status"),
            format!(
                "Select a valid choice. {} is not one of the available choices.",
                value
            ),
        )),
        other => Ok(RowError::new(row, other.field(), other.to_string())),
    }
}

fn line_row_error(row: usize, err: LineError) -> ImportExportResult<RowError> {
    match err {
        LineError::Database(err) => Err(err.into()),
        LineError::Validation(v) => Ok(RowError::new(row, v.field.as_deref(), v.message)),
        other => Ok(RowError::new(row, other.field(), other.to_string())),
    }
}

/// Commit when every row passed, otherwise roll back and report them all.
async fn finish(txn: DatabaseTransaction, errors: Vec<RowError>) -> ImportExportResult<()> {
    if errors.is_empty() {
        txn.commit().await?;
        Ok(())
    } else {
        txn.rollback().await?;
        warn!("Import rejected: {} invalid row(s)", errors.len());
        Err(ImportExportError::Rows(errors))
    }
}

#[derive(Clone)]
pub struct ImportService {
    db: DatabaseConnection,
    policy: UniquenessPolicy,
}

impl ImportService {
    pub fn new(db: DatabaseConnection, policy: UniquenessPolicy) -> Self {
        Self { db, policy }
    }

    /// Import `data` into `target`, returning the number of records created.
    pub async fn import(&self, target: ImportTarget, data: &str) -> ImportExportResult<usize> {
        let count = match target {
            ImportTarget::Partitions => self.import_partitions(data).await?.len(),
            ImportTarget::Extensions => self.import_extensions(data).await?.len(),
            ImportTarget::Lines => self.import_lines(data).await?.len(),
        };
        Ok(count)
    }

    pub async fn import_partitions(&self, data: &str) -> ImportExportResult<Vec<PartitionView>> {
        let rows = read_rows(data, PARTITION_HEADERS, &["name"])?;

        let txn = self.db.begin().await?;
        let mut created = Vec::new();
        let mut errors = Vec::new();
        for row in &rows {
            let enforce_unique = match row.get("enforce_unique") {
                None => true,
                Some(raw) => match parse_bool(raw) {
                    Some(value) => value,
                    None => {
                        errors.push(RowError::new(
                            row.number,
                            Some("enforce_unique"),
                            format!("'{}' is not a valid boolean", raw),
                        ));
                        continue;
                    }
                },
            };

            let form = PartitionForm {
                name: row.get("name").unwrap_or_default().to_string(),
                enforce_unique,
                description: row.get("description").map(str::to_string),
                tags: vec![],
            };
            match partition_service::create_in(&txn, form).await {
                Ok(partition) => created.push(PartitionView::new(&partition, 0)),
                Err(err) => errors.push(partition_row_error(row.number, err)?),
            }
        }
        finish(txn, errors).await?;

        info!("Imported {} partition(s)", created.len());
        Ok(created)
    }

    pub async fn import_extensions(&self, data: &str) -> ImportExportResult<Vec<ExtensionView>> {
        let rows = read_rows(data, EXTENSION_HEADERS, &["dn"])?;

        let txn = self.db.begin().await?;
        let mut created = Vec::new();
        let mut errors = Vec::new();
        for row in &rows {
            let partition = match row.get("partition") {
                Some(raw) => match lookup_partition(&txn, raw).await? {
                    Ok(partition) => Some(partition.id),
                    Err(message) => {
                        errors.push(RowError::new(row.number, Some("partition"), message));
                        continue;
                    }
                },
                None => None,
            };

            let line = match (row.get("device"), row.get("line_name")) {
                (Some(device), Some(line_name)) => {
                    match lookup_line(&txn, device, line_name).await? {
                        Some(line) => Some(line.id),
                        None => {
                            errors.push(RowError::new(
                                row.number,
                                Some("line_name"),
                                format!("Invalid line {} for device {}", line_name, device),
                            ));
                            continue;
                        }
                    }
                }
                (None, Some(_)) => {
                    errors.push(RowError::new(
                        row.number,
                        Some("line_name"),
                        "line_name requires device",
                    ));
                    continue;
                }
                (Some(_), None) => {
                    errors.push(RowError::new(
                        row.number,
                        Some("device"),
                        "device requires line_name",
                    ));
                    continue;
                }
                (None, None) => None,
            };

            let form = ExtensionForm {
                dn: row.get("dn").unwrap_or_default().to_string(),
                partition,
                status: row.get("status").map(|s| StatusValue::Text(s.to_string())),
                description: row.get("description").map(str::to_string),
                ..Default::default()
            };
            let hint = line.map(ParentHint::line).unwrap_or_default();
            match extension_service::create_in(&txn, self.policy, form, &hint).await {
                Ok(extension) => created.push(extension),
                Err(err) => errors.push(extension_row_error(row.number, err)?),
            }
        }

        let views = extension_service::extension_views(&txn, &created).await?;
        finish(txn, errors).await?;

        info!("Imported {} extension(s)", views.len());
        Ok(views)
    }

    pub async fn import_lines(&self, data: &str) -> ImportExportResult<Vec<LineView>> {
        let rows = read_rows(data, LINE_HEADERS, &["name"])?;

        let txn = self.db.begin().await?;
        let mut created = Vec::new();
        let mut errors = Vec::new();
        for row in &rows {
            let device = match row.get("device") {
                Some(name) => match find_device_by_name(&txn, name).await? {
                    Some(device) => Some(device.id),
                    None => {
                        errors.push(RowError::new(
                            row.number,
                            Some("device"),
                            format!("Device '{}' not found.", name),
                        ));
                        continue;
                    }
                },
                None => None,
            };

            let form = LineForm {
                device,
                name: row.get("name").unwrap_or_default().to_string(),
                description: row.get("description").map(str::to_string),
                ..Default::default()
            };
            match line_service::create_in(&txn, form).await {
                Ok(line) => created.push(line),
                Err(err) => errors.push(line_row_error(row.number, err)?),
            }
        }

        let views = line_service::line_views(&txn, &created).await?;
        finish(txn, errors).await?;

        info!("Imported {} line(s)", views.len());
        Ok(views)
    }
}

/// Partition by name, falling back to a numeric ID. The inner error is the
/// row message.
async fn lookup_partition<C: ConnectionTrait>(
    conn: &C,
    raw: &str,
) -> ImportExportResult<Result<partitions::Model, String>> {
    let mut by_name = partitions::Entity::find()
        .filter(partitions::Column::Name.eq(raw))
        .all(conn)
        .await?;
    match by_name.len() {
        1 => return Ok(by_name.pop().ok_or_else(|| "Partition not found.".to_string())),
        0 => {}
        _ => {
            return Ok(Err(format!(
                "Multiple partitions named '{}'; use the partition ID",
                raw
            )))
        }
    }

    if let Ok(id) = raw.parse::<i32>() {
        if let Some(partition) = partitions::Entity::find_by_id(id).one(conn).await? {
            return Ok(Ok(partition));
        }
    }
    Ok(Err("Partition not found.".to_string()))
}

async fn find_device_by_name<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> ImportExportResult<Option<devices::Model>> {
    Ok(devices::Entity::find()
        .filter(devices::Column::Name.eq(name))
        .one(conn)
        .await?)
}

async fn lookup_line<C: ConnectionTrait>(
    conn: &C,
    device: &str,
    line_name: &str,
) -> ImportExportResult<Option<lines::Model>> {
    let Some(device) = find_device_by_name(conn, device).await? else {
        return Ok(None);
    };
    Ok(lines::Entity::find()
        .filter(lines::Column::DeviceId.eq(device.id))
        .filter(lines::Column::Name.eq(line_name))
        .one(conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::extensions;
    use crate::database::test_utils::setup_test_db;
    use crate::services::dcim_service::{DcimService, DeviceForm};
    use crate::services::line_service::LineService;
    use sea_orm::PaginatorTrait;

    #[test]
    fn headers_are_checked() {
        assert!(matches!(
            read_rows("dn,colour\n1,red\n", EXTENSION_HEADERS, &["dn"]),
            Err(ImportExportError::UnexpectedHeader(h)) if h == "colour"
        ));
        assert!(matches!(
            read_rows("partition\nA\n", EXTENSION_HEADERS, &["dn"]),
            Err(ImportExportError::MissingHeader(h)) if h == "dn"
        ));
        assert!(matches!(
            read_rows("dn\n", EXTENSION_HEADERS, &["dn"]),
            Err(ImportExportError::Empty)
        ));
    }

    #[test]
    fn target_names() {
        assert_eq!("Lines".parse::<ImportTarget>().unwrap(), ImportTarget::Lines);
        assert!("devices".parse::<ImportTarget>().is_err());
    }

    #[tokio::test]
    async fn extension_rows_need_both_device_and_line() {
        let (db, _file) = setup_test_db().await;
        let service = ImportService::new(db.clone(), UniquenessPolicy::default());

        let csv = "dn,device,line_name\n1000,,L1\n1001,phone-01,\n1002,,\n";
        let err = service.import_extensions(csv).await.unwrap_err();
        let rows = err.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 1);
        assert_eq!(rows[0].message, "line_name requires device");
        assert_eq!(rows[1].row, 2);
        assert_eq!(rows[1].message, "device requires line_name");

        // The valid third row was rolled back with the rest.
        let stored = extensions::Entity::find().count(&db).await.unwrap();
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn extensions_resolve_partition_status_and_line() {
        let (db, _file) = setup_test_db().await;
        let device = DcimService::new(db.clone())
            .create_device(DeviceForm {
                name: "phone-01".to_string(),
            })
            .await
            .unwrap();
        LineService::new(db.clone())
            .create(LineForm {
                device: Some(device.id),
                name: "L1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let service = ImportService::new(db.clone(), UniquenessPolicy::default());
        service
            .import_partitions("name,enforce_unique\nInternal,true\n")
            .await
            .unwrap();

        let csv = "dn,partition,status,device,line_name\n\
                   1000,Internal,Inactive,phone-01,L1\n\
                   1001,,2,,\n";
        let created = service.import_extensions(csv).await.unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].partition.as_ref().map(|p| p.name.as_str()), Some("Internal"));
        assert_eq!(created[0].device.as_ref().map(|d| d.name.as_str()), Some("phone-01"));
        assert_eq!(created[1].status_label, "Inactive");

        let err = service
            .import_extensions("dn,partition,device,line_name\n1002,Nowhere,,\n1003,,phone-01,L9\n1000,Internal,,\n")
            .await
            .unwrap_err();
        let messages: Vec<&str> = err.rows().iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages[0], "Partition not found.");
        assert_eq!(messages[1], "Invalid line L9 for device phone-01");
        assert!(messages[2].starts_with("Duplicate DN found in Partition Internal: 1000"));
    }

    #[tokio::test]
    async fn bad_status_names_the_choice() {
        let (db, _file) = setup_test_db().await;
        let service = ImportService::new(db, UniquenessPolicy::default());

        let err = service
            .import_extensions("dn,status\n1000,retired\n")
            .await
            .unwrap_err();
        assert_eq!(err.rows()[0].field.as_deref(), Some("status"));
        assert_eq!(
            err.rows()[0].message,
            "Select a valid choice. retired is not one of the available choices."
        );
    }

    #[tokio::test]
    async fn lines_import_checks_devices() {
        let (db, _file) = setup_test_db().await;
        let service = ImportService::new(db, UniquenessPolicy::default());

        let err = service
            .import_lines("device,name\nghost,L1\n")
            .await
            .unwrap_err();
        assert_eq!(err.rows()[0].field.as_deref(), Some("device"));

        let created = service.import_lines("name,description\nspare,Unpatched\n").await.unwrap();
        assert_eq!(created[0].description.as_deref(), Some("Unpatched"));
    }
}
