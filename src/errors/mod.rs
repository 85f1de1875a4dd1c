//! Domain-specific error types for the ipphone service
//!
//! Each area of the service has its own error enum so that callers can match
//! on the failure that actually happened, while the HTTP layer only needs the
//! shared classification helpers (`error_code`, `is_client_error`,
//! `is_not_found`, `is_conflict`, `field`).
//!
//! # Error Categories
//!
//! - **PartitionError**: partition CRUD, protect-on-delete, uniqueness toggles
//! - **ExtensionError**: number records, duplicate detection, parent links
//! - **LineError**: lines on devices
//! - **DcimError**: devices and interfaces
//! - **ImportExportError**: CSV import and export
//!
//! # Examples
//!
//! ```rust
//! use ipphone::errors::ExtensionError;
//!
//! let err = ExtensionError::Duplicate {
//!     scope: "Partition Internal".to_string(),
//!     dn: "1000".to_string(),
//!     conflict_id: 7,
//! };
//!
//! assert_eq!(err.field(), Some("dn"));
//! assert!(err.is_client_error());
//! ```

pub mod dcim;
pub mod extension;
pub mod import_export;
pub mod line;
pub mod partition;
pub mod validation;

pub use dcim::DcimError;
pub use extension::ExtensionError;
pub use import_export::{ImportExportError, RowError};
pub use line::LineError;
pub use partition::PartitionError;
pub use validation::ValidationError;

use sea_orm::{DbErr, SqlErr};

/// Result type alias for partition operations
pub type PartitionResult<T> = Result<T, PartitionError>;

/// Result type alias for extension operations
pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Result type alias for line operations
pub type LineResult<T> = Result<T, LineError>;

/// Result type alias for device and interface operations
pub type DcimResult<T> = Result<T, DcimError>;

/// Result type alias for import/export operations
pub type ImportExportResult<T> = Result<T, ImportExportError>;

/// True when the database rejected a write because of a unique index.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_result_alias() {
        let result: PartitionResult<()> = Err(PartitionError::NotFound(3));
        assert!(result.is_err());
    }

    #[test]
    fn test_extension_result_alias() {
        let result: ExtensionResult<i32> = Err(ExtensionError::NotFound(1));
        assert!(result.is_err());
    }

    #[test]
    fn test_plain_db_error_is_not_unique_violation() {
        let err = DbErr::Custom("boom".to_string());
        assert!(!is_unique_violation(&err));
    }
}
