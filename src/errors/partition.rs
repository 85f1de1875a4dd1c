//! Partition error types

use thiserror::Error;

use super::ValidationError;

/// Partition-related errors
#[derive(Error, Debug)]
pub enum PartitionError {
    /// Partition not found by ID
    #[error("Partition {0} not found")]
    NotFound(i32),

    /// Partition is still referenced by extensions
    #[error("Cannot delete partition '{name}': {count} extension(s) still reference it")]
    InUse {
        /// Partition name
        name: String,
        /// Number of referencing extensions
        count: u64,
    },

    /// Uniqueness cannot be switched on while duplicates exist
    #[error("Cannot enforce unique space on partition '{name}': duplicate DNs {}", .dns.join(", "))]
    DuplicatesPresent {
        /// Partition name
        name: String,
        /// DNs held by more than one extension
        dns: Vec<String>,
    },

    /// Field validation failed
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl PartitionError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PartitionError::Database(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PartitionError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            PartitionError::InUse { .. } | PartitionError::DuplicatesPresent { .. }
        )
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            PartitionError::DuplicatesPresent { .. } => Some("enforce_unique"),
            PartitionError::Validation(err) => err.field.as_deref(),
            _ => None,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PartitionError::NotFound(_) => "NOT_FOUND",
            PartitionError::InUse { .. } => "PROTECTED",
            PartitionError::DuplicatesPresent { .. } => "CONFLICT",
            PartitionError::Validation(_) => "VALIDATION_FAILED",
            PartitionError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_use_is_conflict() {
        let err = PartitionError::InUse {
            name: "Internal".to_string(),
            count: 3,
        };
        assert!(err.is_conflict());
        assert_eq!(err.error_code(), "PROTECTED");
        assert!(err.to_string().contains("3 extension(s)"));
    }

    #[test]
    fn test_duplicates_present_lists_dns() {
        let err = PartitionError::DuplicatesPresent {
            name: "Lab".to_string(),
            dns: vec!["100".to_string(), "200".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Cannot enforce unique space on partition 'Lab': duplicate DNs 100, 200"
        );
        assert_eq!(err.field(), Some("enforce_unique"));
    }
}
