//! Repository contracts consumed by the controller
//!
//! A backend plugs into a resource by implementing [`Repository`] (reads) or
//! [`Persistable`] (reads and mutations) for its entity type and returning one
//! of them, wrapped in a [`Backend`], from the resource's constructor.
//!
//! # Features
//!
//! - **Capabilities**: [`Repository`] and [`Persistable`] as object-safe async traits
//! - **Declared mutability**: [`Backend`] tells read-only and writable backends apart
//! - **Query options**: [`QueryOptions`] with window, sort and [`FilterValue`] filters
//! - **Error signals**: [`RepositoryError`] and [`ValidationError`] drive the status codes
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use rest_dialect::repository::{
//!     Backend, QueryOptions, Repository, RepositoryError, RepositoryResult,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Planet {
//!     name: String,
//! }
//!
//! struct Planets;
//!
//! #[async_trait]
//! impl Repository<Planet> for Planets {
//!     async fn count(&self, _options: &QueryOptions) -> RepositoryResult<u64> {
//!         Ok(0)
//!     }
//!
//!     async fn read(&self, _id: &str) -> RepositoryResult<Planet> {
//!         Err(RepositoryError::NotFound)
//!     }
//!
//!     async fn read_all(&self, _options: &QueryOptions) -> RepositoryResult<Vec<Planet>> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! let backend = Backend::read_only(Planets);
//! assert_eq!(backend.entity_name(), "Planet");
//! assert!(!backend.is_persistable());
//! ```

mod error;
mod options;
mod traits;

pub use error::{RepositoryError, RepositoryErrorKind, ValidationError};
pub use options::{FilterValue, QueryOptions, SortOrder};
pub use traits::{short_type_name, Backend, Entity, Persistable, Repository, RepositoryResult};
