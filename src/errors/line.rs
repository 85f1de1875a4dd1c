//! Line error types

use thiserror::Error;

use super::ValidationError;

/// Line-related errors
#[derive(Error, Debug)]
pub enum LineError {
    /// Line not found by ID
    #[error("Line {0} not found")]
    NotFound(i32),

    /// Parent device does not exist
    #[error("Device {0} not found")]
    DeviceNotFound(i32),

    /// (device, name) already taken
    #[error("Line '{name}' already exists on device '{device}'")]
    DuplicateName {
        /// Device name
        device: String,
        /// Line name
        name: String,
    },

    /// Extension to attach does not exist
    #[error("Extension {0} not found")]
    ExtensionNotFound(i32),

    /// Name pattern could not be expanded
    #[error("Invalid name pattern: {0}")]
    InvalidPattern(String),

    /// Field validation failed
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl LineError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LineError::Database(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LineError::NotFound(_))
    }

    /// Duplicate names are validation failures, so nothing here maps to 409.
    pub fn is_conflict(&self) -> bool {
        false
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            LineError::DeviceNotFound(_) => Some("device"),
            LineError::DuplicateName { .. } => Some("name"),
            LineError::ExtensionNotFound(_) => Some("extension"),
            LineError::InvalidPattern(_) => Some("name_pattern"),
            LineError::Validation(err) => err.field.as_deref(),
            LineError::NotFound(_) | LineError::Database(_) => None,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            LineError::NotFound(_) => "NOT_FOUND",
            LineError::DeviceNotFound(_)
            | LineError::DuplicateName { .. }
            | LineError::ExtensionNotFound(_)
            | LineError::InvalidPattern(_)
            | LineError::Validation(_) => "VALIDATION_FAILED",
            LineError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name() {
        let err = LineError::DuplicateName {
            device: "phone-01".to_string(),
            name: "L1".to_string(),
        };
        assert_eq!(err.to_string(), "Line 'L1' already exists on device 'phone-01'");
        assert!(err.is_client_error());
        assert!(!err.is_conflict());
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn test_device_not_found_is_validation() {
        let err = LineError::DeviceNotFound(5);
        assert!(!err.is_not_found());
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }
}
