//! Per-request dispatch of the REST verbs to a backend
//!
//! A [`Controller`] wraps one [`Backend`] instance for the lifetime of one
//! request. Each verb handler follows the same path: check the backend's
//! capability, call it, map the outcome, render JSON. Handlers never fail;
//! every outcome, including errors, is a finished [`Response`].
//!
//! | Verb            | Success body        | Backend call           |
//! |-----------------|---------------------|------------------------|
//! | `get`           | entity              | `read(id)`             |
//! | `get_all`       | array (maybe `[]`)  | `read_all` + `count`   |
//! | `post`          | `{"id": "<id>"}`    | `save(entity)`         |
//! | `put`           | entity, re-read     | `update(id, entity, fields)` |
//! | `delete`        | `{}`                | `delete(ids)`          |

use std::sync::Arc;

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::error::{ApiError, ApiOperation};
use super::payload::Payload;
use super::query::{parse_options, QueryParams, ID_PARAM};
use super::response::{respond_with_json, try_respond_with_json};
use crate::config::{ControllerConfig, CountErrorPolicy};
use crate::repository::{Backend, Entity, Persistable, RepositoryError};

/// Body of a successful `post`
#[derive(Debug, Serialize)]
struct Created {
    id: String,
}

/// Body of a successful `delete`
#[derive(Debug, Serialize)]
struct Deleted {}

/// Request-scoped REST controller for one entity type
pub struct Controller<T: Entity> {
    backend: Backend<T>,
    entity_name: String,
    config: Arc<ControllerConfig>,
    total_count_header: HeaderName,
}

impl<T: Entity> Controller<T> {
    /// Create a controller around a backend instance
    pub fn new(backend: Backend<T>, config: Arc<ControllerConfig>) -> Self {
        let entity_name = backend.entity_name();
        let total_count_header = config.total_count_header_name();
        Self {
            backend,
            entity_name,
            config,
            total_count_header,
        }
    }

    /// Display name of the entity, as used in messages
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// The wrapped backend
    pub fn backend(&self) -> &Backend<T> {
        &self.backend
    }

    /// Get the mutation capability, or the 405 error for `operation`
    pub fn require_persistable(
        &self,
        operation: ApiOperation,
    ) -> Result<&dyn Persistable<T>, ApiError> {
        self.backend
            .as_persistable()
            .ok_or_else(|| ApiError::method_not_allowed(operation, &self.entity_name))
    }

    /// Read the entity whose id is the `:id` parameter
    pub async fn get(&self, params: &QueryParams) -> Response {
        self.try_get(params)
            .await
            .unwrap_or_else(IntoResponse::into_response)
    }

    /// Read the collection described by the query parameters
    ///
    /// The total-count header carries the backend's count for the same
    /// options.
    pub async fn get_all(&self, params: &QueryParams) -> Response {
        self.try_get_all(params)
            .await
            .unwrap_or_else(IntoResponse::into_response)
    }

    /// Create an entity from a JSON body
    pub async fn post(&self, body: &[u8]) -> Response {
        self.try_post(body)
            .await
            .unwrap_or_else(IntoResponse::into_response)
    }

    /// Update the entity whose id is the `:id` parameter from a JSON object body
    ///
    /// Only the keys present in the body are reported to the backend as
    /// supplied fields. On success the entity is read back and returned.
    pub async fn put(&self, params: &QueryParams, body: &[u8]) -> Response {
        match self.try_put(params, body).await {
            Ok(()) => self.get(params).await,
            Err(e) => e.into_response(),
        }
    }

    /// Delete the entities whose ids are the `:id` parameters
    pub async fn delete(&self, params: &QueryParams) -> Response {
        self.try_delete(params)
            .await
            .unwrap_or_else(IntoResponse::into_response)
    }

    async fn try_get(&self, params: &QueryParams) -> Result<Response, ApiError> {
        let id = single_id(params);
        tracing::debug!(entity = %self.entity_name, id = %id, "get");

        let entity = self
            .backend
            .read(&id)
            .await
            .map_err(|e| self.map_error(ApiOperation::Get, &[id], e))?;

        Ok(respond_with_json(StatusCode::OK, &entity))
    }

    async fn try_get_all(&self, params: &QueryParams) -> Result<Response, ApiError> {
        let operation = ApiOperation::GetAll;
        let options = parse_options(params, self.config.query_options)
            .map_err(|e| ApiError::bad_request(operation, e.to_string()))?;
        tracing::debug!(entity = %self.entity_name, options = ?options, "get_all");

        let entities = self
            .backend
            .read_all(&options)
            .await
            .map_err(|e| self.map_error(operation, &[], e))?;

        let total = match self.backend.count(&options).await {
            Ok(total) => total,
            Err(e) => match self.config.count_errors {
                CountErrorPolicy::Ignore => {
                    tracing::warn!(
                        entity = %self.entity_name,
                        error = %e,
                        "Count failed, reporting a total of 0"
                    );
                    0
                }
                CountErrorPolicy::Fail => return Err(self.map_error(operation, &[], e)),
            },
        };

        let mut response = try_respond_with_json(StatusCode::OK, &entities)
            .map_err(|e| ApiError::internal(operation, e.to_string()))?;
        response
            .headers_mut()
            .insert(self.total_count_header.clone(), HeaderValue::from(total));
        Ok(response)
    }

    async fn try_post(&self, body: &[u8]) -> Result<Response, ApiError> {
        let operation = ApiOperation::Post;
        let repository = self.require_persistable(operation)?;
        tracing::debug!(entity = %self.entity_name, "post");

        let entity: T = serde_json::from_slice(body).map_err(|e| {
            tracing::debug!(entity = %self.entity_name, error = %e, "Undecodable payload");
            ApiError::unprocessable(operation)
        })?;

        let id = repository
            .save(entity)
            .await
            .map_err(|e| self.map_error(operation, &[], e))?;

        Ok(respond_with_json(StatusCode::OK, &Created { id }))
    }

    async fn try_put(&self, params: &QueryParams, body: &[u8]) -> Result<(), ApiError> {
        let operation = ApiOperation::Put;
        let repository = self.require_persistable(operation)?;
        let id = single_id(params);
        tracing::debug!(entity = %self.entity_name, id = %id, "put");

        let payload = Payload::<T>::from_slice(body).map_err(|e| {
            tracing::debug!(entity = %self.entity_name, error = %e, "Undecodable payload");
            ApiError::unprocessable(operation)
        })?;

        repository
            .update(&id, payload.entity, &payload.fields)
            .await
            .map_err(|e| self.map_error(operation, &[id], e))
    }

    async fn try_delete(&self, params: &QueryParams) -> Result<Response, ApiError> {
        let operation = ApiOperation::Delete;
        let repository = self.require_persistable(operation)?;
        let ids: Vec<String> = params
            .get_all(ID_PARAM)
            .into_iter()
            .map(str::to_string)
            .collect();
        tracing::debug!(entity = %self.entity_name, ids = ?ids, "delete");

        repository
            .delete(&ids)
            .await
            .map_err(|e| self.map_error(operation, &ids, e))?;

        Ok(respond_with_json(StatusCode::OK, &Deleted {}))
    }

    fn map_error(&self, operation: ApiOperation, ids: &[String], err: RepositoryError) -> ApiError {
        tracing::debug!(
            entity = %self.entity_name,
            operation = %operation,
            kind = %err.kind(),
            "Backend call failed"
        );
        ApiError::from_repository(operation, &self.entity_name, ids, err)
    }
}

impl<T: Entity> std::fmt::Debug for Controller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("backend", &self.backend)
            .field("config", &self.config)
            .finish()
    }
}

fn single_id(params: &QueryParams) -> String {
    params.get(ID_PARAM).unwrap_or_default().to_string()
}
