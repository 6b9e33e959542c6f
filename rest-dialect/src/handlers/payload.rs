//! Request body decoding
//!
//! A body is decoded once into an ordered JSON object. The entity is built
//! from that object and the object's keys are kept as the list of fields the
//! client supplied, which is what partial updates need.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Reasons a request body cannot become an entity
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Body is not JSON, or does not fit the entity type
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Body is JSON but not an object
    #[error("payload must be a JSON object")]
    NotAnObject,
}

/// A decoded entity plus the keys present in the body, in body order
#[derive(Debug, Clone, PartialEq)]
pub struct Payload<T> {
    /// The entity built from the body
    pub entity: T,
    /// Keys present in the body, whatever their values
    pub fields: Vec<String>,
}

impl<T: DeserializeOwned> Payload<T> {
    /// Decode a JSON object body
    ///
    /// ```rust
    /// use rest_dialect::handlers::Payload;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Thing {
    ///     title: String,
    ///     #[serde(default)]
    ///     note: Option<String>,
    /// }
    ///
    /// let payload = Payload::<Thing>::from_slice(br#"{"title":"a","note":null}"#).unwrap();
    /// assert_eq!(payload.entity.title, "a");
    /// assert_eq!(payload.fields, vec!["title", "note"]);
    /// ```
    ///
    /// # Errors
    ///
    /// [`PayloadError::NotAnObject`] for any JSON value other than an
    /// object, [`PayloadError::Malformed`] for invalid JSON or an object that
    /// does not deserialize into `T`.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        let object = match serde_json::from_slice::<serde_json::Value>(body)? {
            serde_json::Value::Object(object) => object,
            _ => return Err(PayloadError::NotAnObject),
        };

        let fields = object.keys().cloned().collect();
        let entity = serde_json::from_value(serde_json::Value::Object(object))?;

        Ok(Self { entity, fields })
    }
}
