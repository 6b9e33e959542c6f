//! Repository error types
//!
//! A backend reports failures through [`RepositoryError`]. The controller
//! classifies every error into exactly one [`RepositoryErrorKind`] and turns
//! it into an HTTP response; anything that is not a not-found, a
//! permission-denied or a validation failure ends up as a 500 carrying the
//! error's text.
//!
//! # Example
//!
//! ```rust
//! use rest_dialect::repository::{RepositoryError, RepositoryErrorKind, ValidationError};
//!
//! let error = RepositoryError::from(ValidationError::new().with_field("email", "is required"));
//! assert_eq!(error.kind(), RepositoryErrorKind::Validation);
//!
//! let error = RepositoryError::other("connection reset by peer");
//! assert_eq!(error.to_string(), "connection reset by peer");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// The requested entity does not exist
    NotFound,
    /// The caller is not allowed to perform the operation
    PermissionDenied,
    /// The submitted entity failed backend validation
    Validation,
    /// Anything else
    Unclassified,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::PermissionDenied => write!(f, "permission_denied"),
            Self::Validation => write!(f, "validation"),
            Self::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// Error returned by [`Repository`](super::Repository) and
/// [`Persistable`](super::Persistable) implementations
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Makes the controller answer 404
    #[error("data not found")]
    NotFound,

    /// Makes the controller answer 403
    #[error("permission denied")]
    PermissionDenied,

    /// Makes the controller answer 400 with the field errors as body
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Makes the controller answer 500 with this error's text as message
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    /// Wrap any error (or message) as an unclassified failure
    ///
    /// ```rust
    /// use rest_dialect::repository::RepositoryError;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
    /// assert_eq!(RepositoryError::other(io).to_string(), "disk full");
    /// ```
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }

    /// Get the category of this error
    #[must_use]
    pub fn kind(&self) -> RepositoryErrorKind {
        match self {
            Self::NotFound => RepositoryErrorKind::NotFound,
            Self::PermissionDenied => RepositoryErrorKind::PermissionDenied,
            Self::Validation(_) => RepositoryErrorKind::Validation,
            Self::Other(_) => RepositoryErrorKind::Unclassified,
        }
    }

    /// Check if this is a not-found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Check if this is a permission-denied error
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

/// Field-level validation failure reported by a backend
///
/// Serializes as `{"errors": {"<field>": "<message>", ...}}`, which is also
/// the body the controller sends with the 400 response.
///
/// # Example
///
/// ```rust
/// use rest_dialect::repository::ValidationError;
///
/// let mut error = ValidationError::new();
/// error.add_field_error("name", "too short");
/// let error = error.with_field("age", "must be positive");
///
/// assert_eq!(error.errors.len(), 2);
/// assert_eq!(
///     serde_json::to_string(&error).unwrap(),
///     r#"{"errors":{"age":"must be positive","name":"too short"}}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Message per offending field
    pub errors: BTreeMap<String, String>,
}

impl ValidationError {
    /// Create an empty validation error
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for a field, replacing any previous message for it
    pub fn add_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(field.into(), message.into());
    }

    /// Builder form of [`add_field_error`](Self::add_field_error)
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add_field_error(field, message);
        self
    }

    /// Check if no field errors were recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Errors: ")?;
        let mut first = true;
        for (field, message) in &self.errors {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl<K, V> FromIterator<(K, V)> for ValidationError
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            errors: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
