//! API error types for controller operations
//!
//! Every failed request ends as an [`ApiError`]: the operation that failed,
//! the [`ApiErrorKind`] deciding the status code, and the message sent to the
//! client. Repository failures are classified by
//! [`ApiError::from_repository`], a total mapping:
//!
//! | Repository error   | Status | Body                                   |
//! |--------------------|--------|----------------------------------------|
//! | `NotFound`         | 404    | `{"error": "<entity>(id:<id>) not found"}` |
//! | `PermissionDenied` | 403    | `{"error": "<Verb> <entity>...: Permission denied"}` |
//! | `Validation`       | 400    | `{"errors": {...}}`                    |
//! | anything else      | 500    | `{"error": "<error text>"}`            |
//!
//! # Example
//!
//! ```rust
//! use axum::http::StatusCode;
//! use rest_dialect::handlers::{ApiError, ApiErrorKind, ApiOperation};
//! use rest_dialect::repository::RepositoryError;
//!
//! let ids = vec!["42".to_string()];
//! let error = ApiError::from_repository(
//!     ApiOperation::Put,
//!     "Thing",
//!     &ids,
//!     RepositoryError::PermissionDenied,
//! );
//! assert_eq!(error.kind, ApiErrorKind::Forbidden);
//! assert_eq!(error.kind.status_code(), StatusCode::FORBIDDEN);
//! assert_eq!(error.message, "Updating Thing(id:42): Permission denied");
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::response::{respond_with_error, respond_with_json};
use crate::repository::{RepositoryError, ValidationError};

/// Message sent when a request body cannot be decoded
pub const INVALID_PAYLOAD_MESSAGE: &str = "Invalid request payload";

/// Controller operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Reading one entity
    Get,
    /// Reading a collection
    GetAll,
    /// Creating an entity
    Post,
    /// Updating an entity
    Put,
    /// Deleting entities
    Delete,
}

impl ApiOperation {
    /// Verb used in permission-denied messages
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Get | Self::GetAll => "Reading",
            Self::Post => "Saving",
            Self::Put => "Updating",
            Self::Delete => "Deleting",
        }
    }

    /// Check if the operation mutates data
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Delete)
    }
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::GetAll => write!(f, "get_all"),
            Self::Post => write!(f, "post"),
            Self::Put => write!(f, "put"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Entity was not found
    NotFound,
    /// Access denied
    Forbidden,
    /// The backend rejected the entity's fields
    ValidationFailed,
    /// Invalid query parameters
    BadRequest,
    /// Mutation on a read-only resource
    MethodNotAllowed,
    /// Request body could not be decoded
    UnprocessablePayload,
    /// Any other failure
    InternalError,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::MethodNotAllowed => write!(f, "method_not_allowed"),
            Self::UnprocessablePayload => write!(f, "unprocessable_payload"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::ValidationFailed | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnprocessablePayload => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured API error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Message sent as the `error` field
    pub message: String,
    /// Field errors sent as the `errors` map instead of `message`
    pub field_errors: Option<ValidationError>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            field_errors: None,
        }
    }

    /// Classify a repository failure
    ///
    /// `entity` is the display name of the entity and `ids` the ids the
    /// request addressed (empty for collection reads and creation).
    pub fn from_repository(
        operation: ApiOperation,
        entity: &str,
        ids: &[String],
        err: RepositoryError,
    ) -> Self {
        let target = describe_target(entity, ids);
        match err {
            RepositoryError::NotFound => Self::new(
                operation,
                ApiErrorKind::NotFound,
                format!("{} not found", target),
            ),
            RepositoryError::PermissionDenied if operation == ApiOperation::GetAll => Self::new(
                operation,
                ApiErrorKind::Forbidden,
                format!("Error reading {}: Permission denied", target),
            ),
            RepositoryError::PermissionDenied => Self::new(
                operation,
                ApiErrorKind::Forbidden,
                format!("{} {}: Permission denied", operation.verb(), target),
            ),
            RepositoryError::Validation(errors) => Self::validation(operation, errors),
            RepositoryError::Other(e) => {
                Self::new(operation, ApiErrorKind::InternalError, e.to_string())
            }
        }
    }

    /// Validation failure carrying field errors
    pub fn validation(operation: ApiOperation, errors: ValidationError) -> Self {
        Self {
            operation,
            kind: ApiErrorKind::ValidationFailed,
            message: errors.to_string(),
            field_errors: Some(errors),
        }
    }

    /// Mutation attempted on a read-only resource
    ///
    /// ```rust
    /// use rest_dialect::handlers::{ApiError, ApiOperation};
    ///
    /// let error = ApiError::method_not_allowed(ApiOperation::Delete, "Catalog");
    /// assert_eq!(error.message, "Method not allowed: Catalog is read-only");
    /// ```
    pub fn method_not_allowed(operation: ApiOperation, entity: &str) -> Self {
        Self::new(
            operation,
            ApiErrorKind::MethodNotAllowed,
            format!("Method not allowed: {} is read-only", entity),
        )
    }

    /// Request body could not be decoded into the entity
    pub fn unprocessable(operation: ApiOperation) -> Self {
        Self::new(
            operation,
            ApiErrorKind::UnprocessablePayload,
            INVALID_PAYLOAD_MESSAGE,
        )
    }

    /// Malformed query parameters
    pub fn bad_request(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::BadRequest, message)
    }

    /// Unexpected failure
    pub fn internal(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::InternalError, message)
    }
}

/// `entity` alone, or `entity(id:<ids joined by ",">)`
fn describe_target(entity: &str, ids: &[String]) -> String {
    if ids.is_empty() {
        entity.to_string()
    } else {
        format!("{}(id:{})", entity, ids.join(","))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                status = status.as_u16(),
                "API error: {}", self.message
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                kind = %self.kind,
                status = status.as_u16(),
                "API error: {}", self.message
            );
        }

        match self.field_errors {
            Some(errors) => respond_with_json(status, &errors),
            None => respond_with_error(status, self.message),
        }
    }
}
