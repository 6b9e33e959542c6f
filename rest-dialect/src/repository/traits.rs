//! Repository capability traits
//!
//! A backend is described by what it can do:
//!
//! - [`Repository`]: read-only access (`count`, `read`, `read_all`)
//! - [`Persistable`]: everything a [`Repository`] does plus `save`, `update`
//!   and `delete`
//!
//! The integrator's constructor returns one of the two wrapped in a
//! [`Backend`], so the controller knows statically whether mutations are
//! allowed instead of probing the object at runtime.
//!
//! # Example
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use rest_dialect::repository::{QueryOptions, Repository, RepositoryError, RepositoryResult};
//!
//! struct ArticleRepository {
//!     pool: PgPool,
//! }
//!
//! #[async_trait]
//! impl Repository<Article> for ArticleRepository {
//!     async fn count(&self, options: &QueryOptions) -> RepositoryResult<u64> {
//!         todo!()
//!     }
//!
//!     async fn read(&self, id: &str) -> RepositoryResult<Article> {
//!         sqlx::query_as!(Article, "SELECT * FROM articles WHERE id = $1", id)
//!             .fetch_optional(&self.pool)
//!             .await
//!             .map_err(RepositoryError::other)?
//!             .ok_or(RepositoryError::NotFound)
//!     }
//!
//!     async fn read_all(&self, options: &QueryOptions) -> RepositoryResult<Vec<Article>> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::RepositoryError;
use super::options::QueryOptions;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Payload type served by a resource
///
/// Implemented for every type that can travel as JSON and cross task
/// boundaries.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Entity for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Read-only data access for one entity type
///
/// A fresh instance is created for each request, so implementations may
/// capture request-scoped context (the current principal, a transaction)
/// and must not rely on state surviving between requests.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Count the entities matching `options`
    ///
    /// The controller uses this for the total-count header of collection
    /// reads. The window (`offset`/`max`) should be ignored when counting.
    async fn count(&self, options: &QueryOptions) -> RepositoryResult<u64>;

    /// Read one entity by id
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] if there is no such entity.
    async fn read(&self, id: &str) -> RepositoryResult<T>;

    /// Read the entities matching `options`
    ///
    /// An empty result is `Ok(vec![])`, not an error.
    async fn read_all(&self, options: &QueryOptions) -> RepositoryResult<Vec<T>>;

    /// Name of the entity used in response messages
    ///
    /// Defaults to the short name of `T`.
    fn entity_name(&self) -> String {
        short_type_name::<T>()
    }
}

/// Data access that can also create, change and remove entities
#[async_trait]
pub trait Persistable<T: Entity>: Repository<T> {
    /// Store a new entity and return the id the backend assigned to it
    async fn save(&self, entity: T) -> RepositoryResult<String>;

    /// Update the entity with id `id`
    ///
    /// `fields` lists the keys the client sent in the request body, in body
    /// order. Backends that support partial updates should only touch these.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] if there is no such entity.
    async fn update(&self, id: &str, entity: T, fields: &[String]) -> RepositoryResult<()>;

    /// Remove the entities with the given ids
    async fn delete(&self, ids: &[String]) -> RepositoryResult<()>;
}

/// A backend instance together with its declared capability
///
/// ```rust,ignore
/// use rest_dialect::repository::Backend;
///
/// let backend = Backend::persistable(ArticleRepository::new(pool.clone()));
/// assert!(backend.is_persistable());
///
/// let backend = Backend::read_only(ArchiveRepository::new(pool));
/// assert!(backend.as_persistable().is_none());
/// ```
pub enum Backend<T: Entity> {
    /// Supports reads only; every mutation answers 405
    ReadOnly(Box<dyn Repository<T>>),
    /// Supports reads and mutations
    Persistable(Box<dyn Persistable<T>>),
}

impl<T: Entity> Backend<T> {
    /// Wrap a read-only repository
    pub fn read_only(repository: impl Repository<T> + 'static) -> Self {
        Self::ReadOnly(Box::new(repository))
    }

    /// Wrap a repository that supports mutations
    pub fn persistable(repository: impl Persistable<T> + 'static) -> Self {
        Self::Persistable(Box::new(repository))
    }

    /// Check if mutations are supported
    #[must_use]
    pub fn is_persistable(&self) -> bool {
        matches!(self, Self::Persistable(_))
    }

    /// Get the mutation capability, if the backend has it
    #[must_use]
    pub fn as_persistable(&self) -> Option<&dyn Persistable<T>> {
        match self {
            Self::ReadOnly(_) => None,
            Self::Persistable(repository) => Some(repository.as_ref()),
        }
    }

    /// Count the entities matching `options`
    pub async fn count(&self, options: &QueryOptions) -> RepositoryResult<u64> {
        match self {
            Self::ReadOnly(repository) => repository.count(options).await,
            Self::Persistable(repository) => repository.count(options).await,
        }
    }

    /// Read one entity by id
    pub async fn read(&self, id: &str) -> RepositoryResult<T> {
        match self {
            Self::ReadOnly(repository) => repository.read(id).await,
            Self::Persistable(repository) => repository.read(id).await,
        }
    }

    /// Read the entities matching `options`
    pub async fn read_all(&self, options: &QueryOptions) -> RepositoryResult<Vec<T>> {
        match self {
            Self::ReadOnly(repository) => repository.read_all(options).await,
            Self::Persistable(repository) => repository.read_all(options).await,
        }
    }

    /// Name of the entity used in response messages
    #[must_use]
    pub fn entity_name(&self) -> String {
        match self {
            Self::ReadOnly(repository) => repository.entity_name(),
            Self::Persistable(repository) => repository.entity_name(),
        }
    }
}

impl<T: Entity> std::fmt::Debug for Backend<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let capability = match self {
            Self::ReadOnly(_) => "ReadOnly",
            Self::Persistable(_) => "Persistable",
        };
        f.debug_tuple(capability).field(&self.entity_name()).finish()
    }
}

/// Last path segment of a type name, without generic arguments
///
/// ```rust
/// use rest_dialect::repository::short_type_name;
///
/// assert_eq!(short_type_name::<String>(), "String");
/// assert_eq!(short_type_name::<Vec<u8>>(), "Vec");
/// ```
#[must_use]
pub fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
