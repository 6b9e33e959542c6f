//! Error types for the service plumbing
//!
//! Request-level failures are [`ApiError`](crate::handlers::ApiError)s; this
//! type covers loading configuration, installing tracing and running the
//! server.

use thiserror::Error;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service error
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Configuration parsed but holds an unusable value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tracing subscriber could not be installed
    #[error("Tracing initialization failed: {0}")]
    Tracing(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "I/O error: port taken");
    }

    #[test]
    fn test_figment_error_conversion() {
        let err: Error = figment::Error::from("bad value".to_string()).into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_invalid_config_display() {
        let err = Error::InvalidConfig("port must not be 0".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: port must not be 0");
    }
}
