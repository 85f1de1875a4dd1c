//! Device and interface error types

use thiserror::Error;

use super::ValidationError;

#[derive(Error, Debug)]
pub enum DcimError {
    #[error("Device {0} not found")]
    DeviceNotFound(i32),

    #[error("Interface {0} not found")]
    InterfaceNotFound(i32),

    #[error("Device '{0}' already exists")]
    DuplicateDevice(String),

    #[error("Interface '{name}' already exists on device '{device}'")]
    DuplicateInterface { device: String, name: String },

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl DcimError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, DcimError::Database(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DcimError::DeviceNotFound(_) | DcimError::InterfaceNotFound(_)
        )
    }

    /// Name clashes are reported as validation failures.
    pub fn is_conflict(&self) -> bool {
        false
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            DcimError::DuplicateDevice(_) | DcimError::DuplicateInterface { .. } => Some("name"),
            DcimError::Validation(err) => err.field.as_deref(),
            _ => None,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DcimError::DeviceNotFound(_) | DcimError::InterfaceNotFound(_) => "NOT_FOUND",
            DcimError::DuplicateDevice(_)
            | DcimError::DuplicateInterface { .. }
            | DcimError::Validation(_) => "VALIDATION_FAILED",
            DcimError::Database(_) => "DATABASE_ERROR",
        }
    }
}
