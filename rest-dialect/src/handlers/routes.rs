//! Mounting a backend as an axum resource
//!
//! A [`Resource`] pairs a backend constructor with controller settings and
//! turns them into a [`Router`]:
//!
//! | Route    | Method | Controller |
//! |----------|--------|------------|
//! | `/`      | GET    | `get_all`  |
//! | `/`      | POST   | `post`     |
//! | `/{id}`  | GET    | `get`      |
//! | `/{id}`  | PUT    | `put`      |
//! | `/{id}`  | DELETE | `delete`   |
//!
//! The constructor runs once per request with the request head, so a backend
//! can pick up per-request context (headers, extensions set by upstream
//! middleware) and is dropped with the request. Path parameters reach the
//! controller as `:`-prefixed query parameters (`/{id}` becomes `:id`).
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::Router;
//! use rest_dialect::handlers::Resource;
//! use rest_dialect::repository::Backend;
//!
//! let articles = Resource::new(move |parts| {
//!     let user = parts.extensions.get::<CurrentUser>().cloned();
//!     Backend::persistable(ArticleRepository::new(pool.clone(), user))
//! });
//!
//! let app: Router = Router::new().nest("/articles", articles.router());
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::request::Parts,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use super::controller::Controller;
use super::error::{ApiError, ApiOperation};
use super::query::QueryParams;
use crate::config::ControllerConfig;
use crate::repository::{Backend, Entity};

/// Builds the backend for one request from the request head
pub type RepositoryConstructor<T> = Arc<dyn Fn(&Parts) -> Backend<T> + Send + Sync>;

/// One REST collection: a backend constructor plus controller settings
pub struct Resource<T: Entity> {
    constructor: RepositoryConstructor<T>,
    config: Arc<ControllerConfig>,
}

impl<T: Entity> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            constructor: Arc::clone(&self.constructor),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T: Entity> Resource<T> {
    /// Create a resource with default controller settings
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(&Parts) -> Backend<T> + Send + Sync + 'static,
    {
        Self {
            constructor: Arc::new(constructor),
            config: Arc::new(ControllerConfig::default()),
        }
    }

    /// Replace the controller settings
    #[must_use]
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Controller settings in use
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Build the backend and controller for one request
    pub fn controller(&self, parts: &Parts) -> Controller<T> {
        Controller::new((self.constructor)(parts), Arc::clone(&self.config))
    }

    /// Router serving the collection at `/` and its items at `/{id}`
    ///
    /// Usually nested under the collection's path.
    pub fn router<S>(self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        Router::new()
            .route("/", get(list::<T>).post(create::<T>))
            .route(
                "/{id}",
                get(show::<T>).put(update::<T>).delete(remove::<T>),
            )
            .with_state(self)
    }
}

impl<T: Entity> std::fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn list<T: Entity>(State(resource): State<Resource<T>>, request: Request) -> Response {
    let (parts, _) = request.into_parts();
    let params = query_params(&parts, Vec::new());
    resource.controller(&parts).get_all(&params).await
}

async fn show<T: Entity>(
    State(resource): State<Resource<T>>,
    Path(path): Path<Vec<(String, String)>>,
    request: Request,
) -> Response {
    let (parts, _) = request.into_parts();
    let params = query_params(&parts, path);
    resource.controller(&parts).get(&params).await
}

async fn create<T: Entity>(State(resource): State<Resource<T>>, request: Request) -> Response {
    let operation = ApiOperation::Post;
    let (parts, body) = request.into_parts();
    let controller = resource.controller(&parts);
    if let Err(e) = controller.require_persistable(operation) {
        return e.into_response();
    }

    match read_body(body, resource.config.max_body_bytes, operation).await {
        Ok(bytes) => controller.post(&bytes).await,
        Err(e) => e.into_response(),
    }
}

async fn update<T: Entity>(
    State(resource): State<Resource<T>>,
    Path(path): Path<Vec<(String, String)>>,
    request: Request,
) -> Response {
    let operation = ApiOperation::Put;
    let (parts, body) = request.into_parts();
    let controller = resource.controller(&parts);
    if let Err(e) = controller.require_persistable(operation) {
        return e.into_response();
    }

    let params = query_params(&parts, path);
    match read_body(body, resource.config.max_body_bytes, operation).await {
        Ok(bytes) => controller.put(&params, &bytes).await,
        Err(e) => e.into_response(),
    }
}

async fn remove<T: Entity>(
    State(resource): State<Resource<T>>,
    Path(path): Path<Vec<(String, String)>>,
    request: Request,
) -> Response {
    let (parts, _) = request.into_parts();
    let params = query_params(&parts, path);
    resource.controller(&parts).delete(&params).await
}

/// Decoded query string followed by the path parameters as `:name` keys
///
/// `:`-prefixed keys in the client's query string are dropped; routing keys
/// only ever come from the matched path.
fn query_params(parts: &Parts, path: Vec<(String, String)>) -> QueryParams {
    let mut params: QueryParams = parts
        .uri
        .query()
        .map(QueryParams::from_query)
        .unwrap_or_default()
        .iter()
        .filter(|(key, _)| !key.starts_with(':'))
        .collect();
    for (name, value) in path {
        params.append(format!(":{}", name), value);
    }
    params
}

async fn read_body(
    body: Body,
    limit: usize,
    operation: ApiOperation,
) -> Result<axum::body::Bytes, ApiError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        tracing::debug!(operation = %operation, error = %e, limit, "Unreadable request body");
        ApiError::unprocessable(operation)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{body_json, FakeRepository, Thing};
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn app(fake: &FakeRepository) -> Router {
        let writable = fake.clone();
        let readable = fake.clone();
        Router::new()
            .nest(
                "/things",
                Resource::<Thing>::new(move |_| Backend::persistable(writable.clone())).router(),
            )
            .nest(
                "/catalog",
                Resource::<Thing>::new(move |_| Backend::read_only(readable.clone())).router(),
            )
    }

    async fn send(app: Router, method: Method, uri: &str, body: Body) -> Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_route() {
        let fake = FakeRepository::with_things(&["alpha", "beta"]);
        let response = send(app(&fake), Method::GET, "/things?_start=0&_end=1", Body::empty()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-total-count"], "2");
        assert_eq!(
            body_json(response).await,
            json!([{"id": "1", "title": "alpha", "rank": 1}])
        );
    }

    #[tokio::test]
    async fn test_list_route_filters() {
        let fake = FakeRepository::with_things(&["alpha", "beta"]);
        let response = send(app(&fake), Method::GET, "/things?title=beta", Body::empty()).await;

        assert_eq!(
            body_json(response).await,
            json!([{"id": "2", "title": "beta", "rank": 2}])
        );
    }

    #[tokio::test]
    async fn test_show_route_flattens_path_id() {
        let fake = FakeRepository::with_things(&["alpha", "beta"]);
        let response = send(app(&fake), Method::GET, "/things/2", Body::empty()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["title"], "beta");
    }

    #[tokio::test]
    async fn test_show_route_not_found() {
        let fake = FakeRepository::new();
        let response = send(app(&fake), Method::GET, "/things/42", Body::empty()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Thing(id:42) not found"})
        );
    }

    #[tokio::test]
    async fn test_create_route() {
        let fake = FakeRepository::new();
        let response = send(
            app(&fake),
            Method::POST,
            "/things",
            Body::from(r#"{"title":"fresh"}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"id": "1"}));
        assert_eq!(fake.thing("1").unwrap().title, "fresh");
    }

    #[tokio::test]
    async fn test_update_route() {
        let fake = FakeRepository::with_things(&["alpha"]);
        let response = send(
            app(&fake),
            Method::PUT,
            "/things/1",
            Body::from(r#"{"rank":5}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"id": "1", "title": "alpha", "rank": 5})
        );
        assert_eq!(fake.last_update().unwrap(), ("1".to_string(), vec!["rank".to_string()]));
    }

    #[tokio::test]
    async fn test_delete_route() {
        let fake = FakeRepository::with_things(&["alpha"]);
        let response = send(app(&fake), Method::DELETE, "/things/1", Body::empty()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({}));
        assert!(fake.thing("1").is_none());
    }

    #[tokio::test]
    async fn test_query_cannot_supply_routing_keys() {
        let fake = FakeRepository::with_things(&["alpha", "beta"]);

        let response = send(app(&fake), Method::GET, "/things/1?%3Aid=2", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["title"], "alpha");

        let response = send(app(&fake), Method::DELETE, "/things/1?%3Aid=2", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fake.deleted(), vec!["1"]);
        assert!(fake.thing("2").is_some());
    }

    #[tokio::test]
    async fn test_routing_keys_are_not_filters() {
        let fake = FakeRepository::with_things(&["alpha"]);
        send(app(&fake), Method::GET, "/things?%3Aid=5&title=alpha", Body::empty()).await;
        let options = fake.last_options().unwrap();
        assert!(options.filter(":id").is_none());
        assert_eq!(options.filters.len(), 1);
    }

    #[tokio::test]
    async fn test_read_only_resource_rejects_mutations() {
        let fake = FakeRepository::with_things(&["alpha"]);
        let cases = [
            (Method::POST, "/catalog", r#"{"title":"x"}"#),
            (Method::PUT, "/catalog/1", r#"{"title":"x"}"#),
            (Method::DELETE, "/catalog/1", ""),
        ];

        for (method, uri, body) in cases {
            let response = send(app(&fake), method, uri, Body::from(body)).await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(
                body_json(response).await,
                json!({"error": "Method not allowed: Thing is read-only"})
            );
        }
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_resource_serves_reads() {
        let fake = FakeRepository::with_things(&["alpha"]);
        let response = send(app(&fake), Method::GET, "/catalog/1", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_body_is_unprocessable() {
        let fake = FakeRepository::new();
        let resource = Resource::<Thing>::new({
            let fake = fake.clone();
            move |_| Backend::persistable(fake.clone())
        })
        .with_config(ControllerConfig {
            max_body_bytes: 8,
            ..ControllerConfig::default()
        });
        let app = Router::new().nest("/things", resource.router());

        let response = send(
            app,
            Method::POST,
            "/things",
            Body::from(r#"{"title":"much too long"}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Invalid request payload"})
        );
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_constructor_sees_request_head() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let resource = Resource::<Thing>::new({
            let seen = Arc::clone(&seen);
            move |parts: &Parts| {
                let user = parts
                    .headers
                    .get("x-user")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("anonymous")
                    .to_string();
                seen.lock().unwrap().push(user);
                Backend::read_only(FakeRepository::new())
            }
        });
        let app = Router::new().nest("/things", resource.router());

        app.oneshot(
            Request::builder()
                .uri("/things")
                .header("x-user", "ada")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["ada".to_string()]);
    }

    #[test]
    fn test_resource_is_cloneable_and_keeps_config() {
        let resource = Resource::<Thing>::new(|_| Backend::read_only(FakeRepository::new()))
            .with_config(ControllerConfig {
                total_count_header: "X-Count".to_string(),
                ..ControllerConfig::default()
            });
        let clone = resource.clone();
        assert_eq!(clone.config().total_count_header, "X-Count");
    }
}
