//! # rest-dialect
//!
//! Generic REST controller speaking the JSON Server dialect used by admin
//! front-ends, on top of axum.
//!
//! Implement [`Repository`](repository::Repository) (read-only) or
//! [`Persistable`](repository::Persistable) (read-write) for an entity type,
//! hand a constructor for it to a [`Resource`](handlers::Resource), and mount
//! the resource's router. The controller takes care of the query syntax, the
//! status codes and the JSON bodies.
//!
//! ## Features
//!
//! - **Query dialect**: `_start`, `_end`, `_sort`, `_order`, `_filters` and plain filter parameters
//! - **Capabilities**: read-only backends answer 405 to every mutation
//! - **Deterministic errors**: not-found, permission-denied, validation and unknown errors map to 404, 403, 400 and 500
//! - **Partial updates**: `PUT` reports exactly the keys present in the body
//! - **Configuration**: Figment layering of defaults, TOML files and `REST_DIALECT_` environment variables
//! - **Graceful shutdown**: Proper signal handling (SIGTERM, SIGINT)
//!
//! ## Example
//!
//! ```rust,ignore
//! use rest_dialect::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let things = Resource::new(|_parts| Backend::persistable(ThingRepository::default()))
//!         .with_config(config.controller.clone());
//!
//!     let app = Router::new().nest("/things", things.router());
//!
//!     Server::new(config).serve(app).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod repository;

#[cfg(feature = "observability")]
pub mod observability;

#[cfg(feature = "server")]
pub mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, ControllerConfig, CountErrorPolicy, ParsePolicy, ServiceConfig};
    pub use crate::error::{Error, Result};

    pub use crate::handlers::{
        parse_options, respond_with_error, respond_with_json, ApiError, ApiErrorKind,
        ApiOperation, Controller, QueryParams, RepositoryConstructor, Resource, ID_PARAM,
        TOTAL_COUNT_HEADER,
    };

    pub use crate::repository::{
        Backend, Entity, FilterValue, Persistable, QueryOptions, Repository, RepositoryError,
        RepositoryErrorKind, RepositoryResult, SortOrder, ValidationError,
    };

    #[cfg(feature = "observability")]
    pub use crate::observability::init_tracing;

    #[cfg(feature = "server")]
    pub use crate::server::Server;

    pub use axum::{
        http::{request::Parts, HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        Router,
    };

    pub use serde::{Deserialize, Serialize};

    // Re-export tracing macros
    pub use tracing::{debug, error, info, warn};

    // Re-export async-trait for implementing the repository traits
    pub use async_trait::async_trait;
}
