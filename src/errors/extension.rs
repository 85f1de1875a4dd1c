//! Number record (extension) error types
//!
//! # Examples
//!
//! ```rust
//! use ipphone::errors::ExtensionError;
//!
//! let err = ExtensionError::Duplicate {
//!     scope: "global table".to_string(),
//!     dn: "2000".to_string(),
//!     conflict_id: 12,
//! };
//! assert_eq!(err.to_string(), "Duplicate DN found in global table: 2000 (#12)");
//! ```

use thiserror::Error;

use super::ValidationError;

/// Extension-related errors
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// Extension not found by ID
    #[error("Extension {0} not found")]
    NotFound(i32),

    /// Another record already holds this DN in the same uniqueness scope
    #[error("Duplicate DN found in {scope}: {dn} (#{conflict_id})")]
    Duplicate {
        /// Human readable scope, "Partition <name>" or "global table"
        scope: String,
        /// The conflicting record's DN
        dn: String,
        /// The conflicting record's ID
        conflict_id: i32,
    },

    /// Global uniqueness cannot be switched on while duplicates exist
    #[error("Cannot enforce global DN uniqueness: duplicate DNs {}", .0.join(", "))]
    GlobalDuplicates(Vec<String>),

    /// Referenced partition does not exist
    #[error("Partition {0} not found")]
    PartitionNotFound(i32),

    /// Both a line and an interface were requested as parent
    #[error("An extension can be assigned to a line or an interface, not both")]
    ConflictingParent,

    /// Unknown status value or label
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Bulk creation pattern could not be expanded
    #[error("Invalid DN pattern: {0}")]
    InvalidPattern(String),

    /// Field validation failed
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl ExtensionError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ExtensionError::Database(_))
    }

    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExtensionError::NotFound(_))
    }

    /// Check if this is a conflict with existing state (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, ExtensionError::GlobalDuplicates(_))
    }

    /// Input field the error is attached to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            ExtensionError::Duplicate { .. } | ExtensionError::GlobalDuplicates(_) => Some("dn"),
            ExtensionError::PartitionNotFound(_) => Some("partition"),
            ExtensionError::ConflictingParent => Some("interface"),
            ExtensionError::InvalidStatus(_) => Some("status"),
            ExtensionError::InvalidPattern(_) => Some("pattern"),
            ExtensionError::Validation(err) => err.field.as_deref(),
            ExtensionError::NotFound(_) | ExtensionError::Database(_) => None,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ExtensionError::NotFound(_) => "NOT_FOUND",
            ExtensionError::Duplicate { .. } => "DUPLICATE_DN",
            ExtensionError::GlobalDuplicates(_) => "CONFLICT",
            ExtensionError::PartitionNotFound(_)
            | ExtensionError::ConflictingParent
            | ExtensionError::InvalidStatus(_)
            | ExtensionError::InvalidPattern(_)
            | ExtensionError::Validation(_) => "VALIDATION_FAILED",
            ExtensionError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_scope_and_record() {
        let err = ExtensionError::Duplicate {
            scope: "Partition Internal".to_string(),
            dn: "1000".to_string(),
            conflict_id: 4,
        };
        assert_eq!(
            err.to_string(),
            "Duplicate DN found in Partition Internal: 1000 (#4)"
        );
        assert_eq!(err.field(), Some("dn"));
        assert_eq!(err.error_code(), "DUPLICATE_DN");
    }

    #[test]
    fn test_not_found() {
        let err = ExtensionError::NotFound(9);
        assert!(err.is_not_found());
        assert!(err.is_client_error());
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_validation_keeps_field() {
        let err: ExtensionError = ValidationError::field("dn", "This field is required").into();
        assert_eq!(err.field(), Some("dn"));
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_database_is_server_error() {
        let err = ExtensionError::Database(sea_orm::DbErr::Custom("x".to_string()));
        assert!(!err.is_client_error());
    }
}
