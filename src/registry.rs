//! # Handler Registry
//!
//! The lookup table from `operationId` to the function implementing it, and
//! the contract those functions are written against.
//!
//! A registry is assembled once at startup and is read-only afterwards:
//!
//! ```rust
//! use oasbind::registry::{HandlerRegistry, HandlerRequest, Reply};
//! use serde_json::json;
//!
//! let registry = HandlerRegistry::builder()
//!     .register("listPets", |_req: HandlerRequest| Reply::new().send(json!([])))
//!     .register("createPets", |req: HandlerRequest| {
//!         let name: String = req.body_field("name")?;
//!         Reply::new().code(201).send(json!({ "id": 1, "name": name }))
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert!(registry.get("listPets").is_some());
//! assert!(registry.get("deletePet").is_none());
//! ```

use crate::ids::RequestId;
use anyhow::{anyhow, Context};
use http::Method;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Request handed to a handler after routing and validation.
///
/// `params`, `query` and `headers` hold values already coerced to the types
/// declared by the operation's parameters (e.g. `?limit=10` arrives as the
/// number `10` when `limit` is an integer). Header names are lower-case.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    pub operation_id: String,
    pub params: Map<String, Value>,
    pub query: Map<String, Value>,
    pub headers: Map<String, Value>,
    pub body: Option<Value>,
}

impl HandlerRequest {
    /// Deserialize one path parameter.
    ///
    /// # Errors
    ///
    /// Fails when the parameter is absent or does not fit `T`.
    pub fn param<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        field(&self.params, name, "path parameter")
    }

    /// Deserialize one query parameter.
    ///
    /// # Errors
    ///
    /// Fails when the parameter is absent or does not fit `T`.
    pub fn query<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        field(&self.query, name, "query parameter")
    }

    /// Raw header value (case-insensitive lookup).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(&name.to_ascii_lowercase())
    }

    /// Deserialize the whole JSON body.
    ///
    /// # Errors
    ///
    /// Fails when there is no body or it does not fit `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let body = self
            .body
            .clone()
            .ok_or_else(|| anyhow!("request has no body"))?;
        serde_json::from_value(body).context("request body has unexpected shape")
    }

    /// Deserialize one top-level field of a JSON object body.
    ///
    /// # Errors
    ///
    /// Fails when the body is not an object, lacks the field, or the field does not fit `T`.
    pub fn body_field<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        match &self.body {
            Some(Value::Object(obj)) => field(obj, name, "body field"),
            _ => Err(anyhow!("request body is not a JSON object")),
        }
    }
}

fn field<T: DeserializeOwned>(map: &Map<String, Value>, name: &str, what: &str) -> anyhow::Result<T> {
    let value = map
        .get(name)
        .cloned()
        .ok_or_else(|| anyhow!("missing {what} `{name}`"))?;
    serde_json::from_value(value).with_context(|| format!("invalid {what} `{name}`"))
}

/// Response produced by a handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// `{ "error": message }` with the given status.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }
}

/// Builder for [`HandlerResponse`]: `Reply::new().code(201).send(pet)`.
#[derive(Debug, Clone, Copy)]
pub struct Reply {
    status: u16,
}

impl Default for Reply {
    fn default() -> Self {
        Self { status: 200 }
    }
}

impl Reply {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn code(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Serialize `body` and finish the response.
    ///
    /// # Errors
    ///
    /// Fails when `body` cannot be represented as JSON.
    pub fn send<T: Serialize>(self, body: T) -> anyhow::Result<HandlerResponse> {
        let body = serde_json::to_value(body).context("failed to serialize response body")?;
        Ok(HandlerResponse::json(self.status, body))
    }
}

/// Something that can answer a bound operation.
///
/// Implemented for every `Fn(HandlerRequest) -> anyhow::Result<HandlerResponse>`;
/// use [`typed`](crate::typed::typed) for handlers with typed input and output.
/// An `Err` is answered with `500 Internal Server Error`.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: HandlerRequest) -> anyhow::Result<HandlerResponse>;
}

impl<F> Handler for F
where
    F: Fn(HandlerRequest) -> anyhow::Result<HandlerResponse> + Send + Sync + 'static,
{
    fn handle(&self, req: HandlerRequest) -> anyhow::Result<HandlerResponse> {
        self(req)
    }
}

pub type SharedHandler = Arc<dyn Handler>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("handler registered more than once for operation(s): {}", .0.join(", "))]
    Duplicate(Vec<String>),
    #[error("empty operation id")]
    EmptyOperationId,
}

/// Immutable mapping from `operationId` to handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<IndexMap<String, SharedHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("operation_ids", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HandlerRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    #[must_use]
    pub fn get(&self, operation_id: &str) -> Option<&SharedHandler> {
        self.handlers.get(operation_id)
    }

    #[must_use]
    pub fn contains(&self, operation_id: &str) -> bool {
        self.handlers.contains_key(operation_id)
    }

    /// Registered ids in registration order.
    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Collects handlers before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: IndexMap<String, SharedHandler>,
    duplicates: Vec<String>,
    empty_id: bool,
}

impl RegistryBuilder {
    #[must_use]
    pub fn register<H: Handler>(self, operation_id: impl Into<String>, handler: H) -> Self {
        self.register_shared(operation_id, Arc::new(handler))
    }

    #[must_use]
    pub fn register_shared(
        mut self,
        operation_id: impl Into<String>,
        handler: SharedHandler,
    ) -> Self {
        let operation_id = operation_id.into();
        if operation_id.is_empty() {
            self.empty_id = true;
        } else if self.handlers.contains_key(&operation_id) {
            self.duplicates.push(operation_id);
        } else {
            self.handlers.insert(operation_id, handler);
        }
        self
    }

    /// Freeze the registry.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Duplicate`] when an id was registered twice and
    /// [`RegistryError::EmptyOperationId`] for an empty id.
    pub fn build(self) -> Result<HandlerRegistry, RegistryError> {
        if self.empty_id {
            return Err(RegistryError::EmptyOperationId);
        }
        if !self.duplicates.is_empty() {
            return Err(RegistryError::Duplicate(self.duplicates));
        }
        Ok(HandlerRegistry {
            handlers: Arc::new(self.handlers),
        })
    }
}
