//! JSON response rendering
//!
//! Every response the controller produces goes through these helpers, so all
//! of them carry `Content-Type: application/json` and a body that is valid
//! JSON. Success bodies are whatever the handler serializes; failure bodies
//! are `{"error": "..."}` (or `{"errors": {...}}` for validation failures,
//! see [`ApiError`](super::ApiError)).
//!
//! # Example
//!
//! ```rust
//! use axum::http::{header, StatusCode};
//! use rest_dialect::handlers::{respond_with_error, respond_with_json};
//!
//! let response = respond_with_json(StatusCode::OK, &serde_json::json!({"id": "1"}));
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
//!
//! let response = respond_with_error(StatusCode::NOT_FOUND, "Thing(id:1) not found");
//! assert_eq!(response.status(), StatusCode::NOT_FOUND);
//! ```

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};

/// Default name of the header carrying the total entity count
pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// Body of every `{"error": "..."}` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    pub error: String,
}

impl ErrorBody {
    /// Create an error body
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Serialize `body` and build a JSON response with the given status
///
/// # Errors
///
/// Returns the serializer's error if `body` cannot be encoded as JSON.
pub fn try_respond_with_json<B>(status: StatusCode, body: &B) -> Result<Response, serde_json::Error>
where
    B: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(body)?;
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

/// Build a JSON response with the given status
///
/// If `body` cannot be encoded, the response is a 500 whose `error` field
/// carries the encoding failure instead.
pub fn respond_with_json<B>(status: StatusCode, body: &B) -> Response
where
    B: Serialize + ?Sized,
{
    match try_respond_with_json(status, body) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, status = status.as_u16(), "Failed to encode response body");
            respond_with_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Build a `{"error": message}` response with the given status
pub fn respond_with_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody::new(message);
    match try_respond_with_json(status, &body) {
        Ok(response) => response,
        // unreachable for a single string field
        Err(_) => {
            let mut response = Response::new(Body::from(r#"{"error":"internal error"}"#));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_respond_with_json_sets_status_and_content_type() {
        let response = respond_with_json(StatusCode::CREATED, &vec![1, 2, 3]);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_json(response).await, serde_json::json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_empty_vec_renders_empty_array() {
        let empty: Vec<String> = Vec::new();
        let response = respond_with_json(StatusCode::OK, &empty);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_respond_with_error_body() {
        let response = respond_with_error(StatusCode::FORBIDDEN, "Reading Thing: Permission denied");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Reading Thing: Permission denied"})
        );
    }

    #[tokio::test]
    async fn test_unencodable_body_becomes_500() {
        // JSON object keys must be strings
        let mut body: BTreeMap<Vec<u8>, u8> = BTreeMap::new();
        body.insert(vec![1, 2], 3);

        assert!(try_respond_with_json(StatusCode::OK, &body).is_err());

        let response = respond_with_json(StatusCode::OK, &body);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let value = body_json(response).await;
        assert!(value["error"].is_string());
        assert!(value.get("errors").is_none());
    }

    #[test]
    fn test_error_body_serialization() {
        let body = ErrorBody::new("boom");
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"error":"boom"}"#);
    }
}
