use serde::Serialize;
use std::fmt;

/// A single input problem, optionally attached to the field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{}: {}", field, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Trim `value` and check it against a maximum length.
pub fn require_text(field: &str, value: &str, max_len: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::field(field, "This field is required"));
    }

    optional_text(field, trimmed, max_len)
}

/// Like [`require_text`] but accepts the empty string.
pub fn optional_text(field: &str, value: &str, max_len: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.chars().count() > max_len {
        return Err(ValidationError::field(
            field,
            format!("Ensure this value has at most {} characters", max_len),
        ));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::field(
            field,
            "Control characters are not allowed",
        ));
    }

    Ok(trimmed.to_string())
}

/// Optional free text: blank input becomes `None`.
pub fn optional_field(
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, ValidationError> {
    match value {
        Some(value) => {
            let cleaned = optional_text(field, value, max_len)?;
            Ok((!cleaned.is_empty()).then_some(cleaned))
        }
        None => Ok(None),
    }
}
