//! Structured error types for API responses.

use crate::types::{EdgeId, TaskId};
use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (4xx-like)
    MissingRequiredField,
    InvalidFieldValue,

    // Not found errors
    TaskNotFound,
    DependencyNotFound,

    // Conflict errors
    SelfDependency,
    DependencyCycle,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured error for API responses.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Ordered loop of task ids for cycle rejections, so the caller can show
    /// which edge to remove instead of a generic "invalid" message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circular_path: Option<Vec<TaskId>>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            circular_path: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn task_not_found(task_id: TaskId) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn dependency_not_found(edge_id: EdgeId) -> Self {
        Self::new(
            ErrorCode::DependencyNotFound,
            format!("Dependency not found: {}", edge_id),
        )
    }

    pub fn self_dependency() -> Self {
        Self::new(ErrorCode::SelfDependency, "Task cannot depend on itself")
    }

    pub fn dependency_cycle(path: Vec<TaskId>) -> Self {
        let mut err = Self::new(ErrorCode::DependencyCycle, "Circular dependency detected");
        err.circular_path = Some(path);
        err
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    /// HTTP status the error maps to at the service boundary.
    pub fn status_code(&self) -> u16 {
        match self.code {
            ErrorCode::MissingRequiredField | ErrorCode::InvalidFieldValue => 400,
            ErrorCode::TaskNotFound | ErrorCode::DependencyNotFound => 404,
            ErrorCode::SelfDependency | ErrorCode::DependencyCycle => 409,
            ErrorCode::DatabaseError | ErrorCode::InternalError => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to ApiError first
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => ApiError::internal(err),
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_error_serializes_code_and_path() {
        let err = ApiError::dependency_cycle(vec![3, 1, 2, 3]);

        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "DEPENDENCY_CYCLE");
        assert_eq!(json["message"], "Circular dependency detected");
        assert_eq!(json["circular_path"], serde_json::json!([3, 1, 2, 3]));
        assert!(json.get("field").is_none());
    }

    #[test]
    fn field_error_omits_absent_parts() {
        let err = ApiError::invalid_value("status", "bad status");

        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "INVALID_FIELD_VALUE");
        assert_eq!(json["field"], "status");
        assert!(json.get("circular_path").is_none());
    }

    #[test]
    fn anyhow_wrapping_preserves_structured_error() {
        let original = ApiError::task_not_found(42);
        let wrapped: anyhow::Error = original.into();

        let recovered = ApiError::from(wrapped);

        assert_eq!(recovered.code, ErrorCode::TaskNotFound);
        assert_eq!(recovered.status_code(), 404);
    }
}
