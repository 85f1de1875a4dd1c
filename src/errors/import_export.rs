//! CSV import/export error types
//!
//! Imports validate every row before anything is committed, so a failed
//! import carries the full list of row problems rather than the first one.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One rejected CSV row. `row` is 1-based and does not count the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct RowError {
    pub row: usize,
    pub field: Option<String>,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "Row {} {}: {}", self.row, field, self.message),
            None => write!(f, "Row {}: {}", self.row, self.message),
        }
    }
}

#[derive(Error, Debug)]
pub enum ImportExportError {
    /// A required column is absent from the header row
    #[error("Required column '{0}' not found")]
    MissingHeader(String),

    /// The header row names a column this entity does not have
    #[error("Unexpected column header '{0}'")]
    UnexpectedHeader(String),

    /// The file has a header but no records
    #[error("No records found")]
    Empty,

    /// One or more rows failed validation; nothing was saved
    #[error("Import failed: {} row(s) invalid", .0.len())]
    Rows(Vec<RowError>),

    /// Unsupported entity or format name
    #[error("Unsupported import target: {0}")]
    UnsupportedTarget(String),

    /// Export filter could not be applied
    #[error("{0}")]
    InvalidFilter(#[from] super::ValidationError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl ImportExportError {
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            ImportExportError::Database(_) | ImportExportError::Io(_)
        )
    }

    pub fn rows(&self) -> &[RowError] {
        match self {
            ImportExportError::Rows(rows) => rows,
            _ => &[],
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ImportExportError::MissingHeader(_)
            | ImportExportError::UnexpectedHeader(_)
            | ImportExportError::Empty
            | ImportExportError::Csv(_) => "INVALID_CSV",
            ImportExportError::Rows(_) => "IMPORT_FAILED",
            ImportExportError::UnsupportedTarget(_) => "UNSUPPORTED",
            ImportExportError::InvalidFilter(_) => "VALIDATION_FAILED",
            ImportExportError::Io(_) | ImportExportError::Database(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_error_display() {
        let err = RowError::new(2, Some("line_name"), "line_name requires device");
        assert_eq!(err.to_string(), "Row 2 line_name: line_name requires device");
        assert_eq!(RowError::new(1, None, "bad").to_string(), "Row 1: bad");
    }

    #[test]
    fn rows_error_counts_rows() {
        let err = ImportExportError::Rows(vec![
            RowError::new(1, None, "a"),
            RowError::new(3, None, "b"),
        ]);
        assert_eq!(err.to_string(), "Import failed: 2 row(s) invalid");
        assert_eq!(err.rows().len(), 2);
        assert_eq!(err.error_code(), "IMPORT_FAILED");
    }
}
