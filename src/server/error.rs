use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use crate::errors::{
    DcimError, ExtensionError, ImportExportError, LineError, PartitionError, ValidationError,
};

/// JSON error body: `{"error", "message", "field", "details"}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub field: Option<String>,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: Option<&str>) -> Self {
        self.field = field.map(str::to_string);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    fn classify(
        client: bool,
        not_found: bool,
        conflict: bool,
        code: &'static str,
        message: String,
    ) -> Self {
        let status = if !client {
            error!("Request failed: {}", message);
            return Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "Internal server error",
            );
        } else if not_found {
            StatusCode::NOT_FOUND
        } else if conflict {
            StatusCode::CONFLICT
        } else {
            StatusCode::BAD_REQUEST
        };
        Self::new(status, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.code,
            "message": self.message,
            "field": self.field,
            "details": self.details,
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", err.message)
            .with_field(err.field.as_deref())
    }
}

impl From<PartitionError> for ApiError {
    fn from(err: PartitionError) -> Self {
        if let PartitionError::Validation(v) = err {
            return v.into();
        }
        let field = err.field().map(str::to_string);
        let details = match &err {
            PartitionError::DuplicatesPresent { dns, .. } => Some(json!({ "dns": dns })),
            PartitionError::InUse { count, .. } => Some(json!({ "extensions": count })),
            _ => None,
        };

        let mut api = Self::classify(
            err.is_client_error(),
            err.is_not_found(),
            err.is_conflict(),
            err.error_code(),
            err.to_string(),
        );
        api.field = field;
        api.details = details;
        api
    }
}

impl From<ExtensionError> for ApiError {
    fn from(err: ExtensionError) -> Self {
        if let ExtensionError::Validation(v) = err {
            return v.into();
        }
        let field = err.field().map(str::to_string);
        let details = match &err {
            ExtensionError::Duplicate { conflict_id, .. } => {
                Some(json!({ "conflict_id": conflict_id }))
            }
            _ => None,
        };

        let mut api = Self::classify(
            err.is_client_error(),
            err.is_not_found(),
            err.is_conflict(),
            err.error_code(),
            err.to_string(),
        );
        api.field = field;
        api.details = details;
        api
    }
}

impl From<LineError> for ApiError {
    fn from(err: LineError) -> Self {
        if let LineError::Validation(v) = err {
            return v.into();
        }
        Self::classify(
            err.is_client_error(),
            err.is_not_found(),
            err.is_conflict(),
            err.error_code(),
            err.to_string(),
        )
        .with_field(err.field())
    }
}

impl From<DcimError> for ApiError {
    fn from(err: DcimError) -> Self {
        if let DcimError::Validation(v) = err {
            return v.into();
        }
        Self::classify(
            err.is_client_error(),
            err.is_not_found(),
            err.is_conflict(),
            err.error_code(),
            err.to_string(),
        )
        .with_field(err.field())
    }
}

impl From<ImportExportError> for ApiError {
    fn from(err: ImportExportError) -> Self {
        if let ImportExportError::InvalidFilter(v) = err {
            return v.into();
        }
        let details = match &err {
            ImportExportError::Rows(rows) => Some(json!({ "rows": rows })),
            _ => None,
        };

        let mut api = Self::classify(
            err.is_client_error(),
            false,
            false,
            err.error_code(),
            err.to_string(),
        );
        api.details = details;
        api
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::classify(false, false, false, "DATABASE_ERROR", err.to_string())
    }
}
