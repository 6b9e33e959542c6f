//! Things API Example - A JSON Server dialect backend kept in memory
//!
//! This example mounts one in-memory store twice:
//!
//! - `/things`: read-write; mutations need an `x-user` header
//! - `/catalog`: the same data, read-only (mutations answer 405)
//!
//! Run with: cargo run --example things-api
//!
//! The service runs on port 8080 by default (configurable via REST_DIALECT_SERVICE__PORT)
//!
//! Test with:
//!   curl -i 'http://localhost:8080/things?_start=0&_end=2&_sort=rank&_order=desc'
//!   curl -i 'http://localhost:8080/things?tag=red&tag=blue'
//!   curl -i 'http://localhost:8080/things?_filters=%7B%22title%22%3A%22kettle%22%7D'
//!   curl -i http://localhost:8080/things/1
//!   curl -i -X POST -H 'x-user: ada' -d '{"title":"lamp","tag":"red","rank":4}' http://localhost:8080/things
//!   curl -i -X PUT -H 'x-user: ada' -d '{"rank":9}' http://localhost:8080/things/1
//!   curl -i -X DELETE -H 'x-user: ada' http://localhost:8080/things/2
//!   curl -i -X DELETE http://localhost:8080/catalog/1   # 405

use std::collections::BTreeMap;
use std::sync::Arc;

use rest_dialect::prelude::*;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Thing {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    rank: i64,
}

impl Thing {
    /// Field value as text, for filtering and sorting
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.clone()),
            "title" => Some(self.title.clone()),
            "tag" => Some(self.tag.clone()),
            "rank" => Some(self.rank.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    things: BTreeMap<u64, Thing>,
    next_id: u64,
}

impl Store {
    fn seeded() -> Self {
        let mut store = Self::default();
        for (title, tag, rank) in [("kettle", "red", 3), ("teapot", "blue", 1), ("mug", "red", 2)] {
            store.insert(Thing {
                title: title.to_string(),
                tag: tag.to_string(),
                rank,
                ..Thing::default()
            });
        }
        store
    }

    fn insert(&mut self, mut thing: Thing) -> String {
        self.next_id += 1;
        thing.id = self.next_id.to_string();
        self.things.insert(self.next_id, thing.clone());
        thing.id
    }

    fn matching<'a>(&'a self, options: &'a QueryOptions) -> impl Iterator<Item = &'a Thing> + 'a {
        self.things.values().filter(move |thing| {
            options.filters.iter().all(|(field, filter)| {
                thing
                    .field(field)
                    .map_or(false, |value| filter.matches(&value))
            })
        })
    }
}

fn parse_id(id: &str) -> RepositoryResult<u64> {
    id.parse().map_err(|_| RepositoryError::NotFound)
}

fn validate(thing: &Thing, fields: Option<&[String]>) -> RepositoryResult<()> {
    let checks_title = fields.map_or(true, |f| f.iter().any(|name| name == "title"));
    if checks_title && thing.title.trim().is_empty() {
        return Err(ValidationError::new()
            .with_field("title", "must not be empty")
            .into());
    }
    Ok(())
}

/// Request-scoped view of the store
struct ThingRepository {
    store: Arc<RwLock<Store>>,
    user: Option<String>,
}

impl ThingRepository {
    fn for_request(store: Arc<RwLock<Store>>, parts: &Parts) -> Self {
        let user = parts
            .headers
            .get("x-user")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self { store, user }
    }

    fn require_user(&self) -> RepositoryResult<&str> {
        self.user.as_deref().ok_or(RepositoryError::PermissionDenied)
    }
}

#[async_trait]
impl Repository<Thing> for ThingRepository {
    async fn count(&self, options: &QueryOptions) -> RepositoryResult<u64> {
        let store = self.store.read().await;
        Ok(store.matching(options).count() as u64)
    }

    async fn read(&self, id: &str) -> RepositoryResult<Thing> {
        let key = parse_id(id)?;
        let store = self.store.read().await;
        store.things.get(&key).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn read_all(&self, options: &QueryOptions) -> RepositoryResult<Vec<Thing>> {
        let store = self.store.read().await;
        let mut things: Vec<Thing> = store.matching(options).cloned().collect();

        if !options.sort.is_empty() {
            things.sort_by(|a, b| {
                let ordering = match options.sort.as_str() {
                    "rank" => a.rank.cmp(&b.rank),
                    field => a.field(field).cmp(&b.field(field)),
                };
                if options.order.is_desc() {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let window = things.into_iter().skip(options.offset as usize);
        Ok(if options.is_windowed() {
            window.take(options.max as usize).collect()
        } else {
            window.collect()
        })
    }
}

#[async_trait]
impl Persistable<Thing> for ThingRepository {
    async fn save(&self, entity: Thing) -> RepositoryResult<String> {
        let user = self.require_user()?;
        validate(&entity, None)?;
        let id = self.store.write().await.insert(entity);
        info!(user, id = %id, "Thing created");
        Ok(id)
    }

    async fn update(&self, id: &str, entity: Thing, fields: &[String]) -> RepositoryResult<()> {
        let user = self.require_user()?;
        validate(&entity, Some(fields))?;
        let key = parse_id(id)?;

        let mut store = self.store.write().await;
        let stored = store.things.get_mut(&key).ok_or(RepositoryError::NotFound)?;
        for field in fields {
            match field.as_str() {
                "title" => stored.title = entity.title.clone(),
                "tag" => stored.tag = entity.tag.clone(),
                "rank" => stored.rank = entity.rank,
                _ => {}
            }
        }
        info!(user, id, fields = ?fields, "Thing updated");
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> RepositoryResult<()> {
        let user = self.require_user()?;
        let keys = ids
            .iter()
            .map(|id| parse_id(id))
            .collect::<RepositoryResult<Vec<u64>>>()?;

        let mut store = self.store.write().await;
        if keys.iter().any(|key| !store.things.contains_key(key)) {
            return Err(RepositoryError::NotFound);
        }
        for key in &keys {
            store.things.remove(key);
        }
        info!(user, ids = ?ids, "Things deleted");
        Ok(())
    }
}

/// Read-only view of the same store, under its own name
struct CatalogRepository(ThingRepository);

#[async_trait]
impl Repository<Thing> for CatalogRepository {
    async fn count(&self, options: &QueryOptions) -> RepositoryResult<u64> {
        self.0.count(options).await
    }

    async fn read(&self, id: &str) -> RepositoryResult<Thing> {
        self.0.read(id).await
    }

    async fn read_all(&self, options: &QueryOptions) -> RepositoryResult<Vec<Thing>> {
        self.0.read_all(options).await
    }

    fn entity_name(&self) -> String {
        "Catalog".to_string()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let store = Arc::new(RwLock::new(Store::seeded()));

    let things = Resource::<Thing>::new({
        let store = Arc::clone(&store);
        move |parts: &Parts| {
            Backend::persistable(ThingRepository::for_request(Arc::clone(&store), parts))
        }
    })
    .with_config(config.controller.clone());

    let catalog = Resource::<Thing>::new({
        let store = Arc::clone(&store);
        move |parts: &Parts| {
            Backend::read_only(CatalogRepository(ThingRepository::for_request(
                Arc::clone(&store),
                parts,
            )))
        }
    })
    .with_config(config.controller.clone());

    let app = Router::new()
        .nest("/things", things.router())
        .nest("/catalog", catalog.router());

    Server::new(config).serve(app).await
}
