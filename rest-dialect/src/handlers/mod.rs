//! REST controller speaking the JSON Server dialect
//!
//! This module turns HTTP requests into calls on a [`Backend`](crate::repository::Backend)
//! and the backend's outcomes into JSON responses with fixed status codes.
//!
//! # Features
//!
//! - **Controller**: [`Controller`] with `get`, `get_all`, `post`, `put` and `delete`
//! - **Routing**: [`Resource`] mounts a backend constructor as an axum [`Router`](axum::Router)
//! - **Query options**: [`parse_options`] for `_start`, `_end`, `_sort`, `_order`, `_filters`
//! - **Error Handling**: [`ApiError`] with a total mapping from repository errors to status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::Router;
//! use rest_dialect::handlers::Resource;
//! use rest_dialect::repository::Backend;
//!
//! let things = Resource::new(|_parts| Backend::persistable(ThingRepository::default()))
//!     .with_config(config.controller.clone());
//! let archive = Resource::new(|_parts| Backend::read_only(ArchiveRepository::default()));
//!
//! let app: Router = Router::new()
//!     .nest("/things", things.router())
//!     .nest("/archive", archive.router());
//! ```
//!
//! # Using the controller directly
//!
//! The controller does not depend on the router; anything that can provide
//! [`QueryParams`] and a body can drive it:
//!
//! ```rust,ignore
//! let controller = Controller::new(backend, Arc::new(ControllerConfig::default()));
//! let params = QueryParams::from_query("_start=0&_end=10&_sort=title");
//! let response = controller.get_all(&params).await;
//! ```

mod controller;
mod error;
mod payload;
mod query;
mod response;
mod routes;

#[cfg(test)]
mod test_support;

pub use controller::Controller;
pub use error::{ApiError, ApiErrorKind, ApiOperation, INVALID_PAYLOAD_MESSAGE};
pub use payload::{Payload, PayloadError};
pub use query::{parse_options, QueryOptionsError, QueryParams, ID_PARAM};
pub use response::{
    respond_with_error, respond_with_json, try_respond_with_json, ErrorBody, TOTAL_COUNT_HEADER,
};
pub use routes::{RepositoryConstructor, Resource};
