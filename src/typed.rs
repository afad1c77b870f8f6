//! # Typed Handlers
//!
//! Handlers that work with their own request and response structs instead of
//! raw JSON maps. The request struct is deserialized from one flat object
//! made of the path parameters, the query parameters and the fields of an
//! object body (a non-object body appears under the key `body`). Later
//! sources win on name clashes.
//!
//! ```rust
//! use oasbind::registry::HandlerRegistry;
//! use oasbind::typed::{typed, TypedHandler, TypedRequest, TypedResponse};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct NewPet { name: String }
//!
//! #[derive(Serialize)]
//! struct Pet { id: u64, name: String }
//!
//! struct CreatePets;
//!
//! impl TypedHandler for CreatePets {
//!     type Request = NewPet;
//!     type Response = Pet;
//!
//!     fn handle(&self, req: TypedRequest<NewPet>) -> anyhow::Result<TypedResponse<Pet>> {
//!         Ok(TypedResponse::new(201, Pet { id: 1, name: req.data.name }))
//!     }
//! }
//!
//! let registry = HandlerRegistry::builder()
//!     .register("createPets", typed(CreatePets))
//!     .build()
//!     .unwrap();
//! assert!(registry.contains("createPets"));
//! ```

use crate::ids::RequestId;
use crate::registry::{Handler, HandlerRequest, HandlerResponse};
use anyhow::Context;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Typed request data passed to a [`TypedHandler`].
#[derive(Debug, Clone)]
pub struct TypedRequest<T> {
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    /// Raw headers, names lower-cased
    pub headers: Map<String, Value>,
    pub data: T,
}

/// Typed response: status code plus a serializable body.
#[derive(Debug, Clone, Serialize)]
pub struct TypedResponse<T: Serialize> {
    pub status: u16,
    pub body: T,
}

impl<T: Serialize> TypedResponse<T> {
    pub fn new(status: u16, body: T) -> Self {
        Self { status, body }
    }

    pub fn ok(body: T) -> Self {
        Self::new(200, body)
    }
}

/// Handler with typed input and output.
pub trait TypedHandler: Send + Sync + 'static {
    type Request: DeserializeOwned;
    type Response: Serialize;

    fn handle(
        &self,
        req: TypedRequest<Self::Request>,
    ) -> anyhow::Result<TypedResponse<Self::Response>>;
}

/// Merge params, query and body into the single object typed requests are read from.
fn request_data(req: &HandlerRequest) -> Value {
    let mut data = Map::new();
    for (k, v) in req.params.iter().chain(req.query.iter()) {
        data.insert(k.clone(), v.clone());
    }
    match &req.body {
        Some(Value::Object(body)) => {
            for (k, v) in body {
                data.insert(k.clone(), v.clone());
            }
        }
        Some(other) => {
            data.insert("body".to_string(), other.clone());
        }
        None => {}
    }
    Value::Object(data)
}

/// Adapter returned by [`typed`].
pub struct Typed<H>(H);

/// Wrap a [`TypedHandler`] so it can be put in a
/// [`HandlerRegistry`](crate::registry::HandlerRegistry).
///
/// A request that does not deserialize into `H::Request` is answered with
/// `400 Bad Request` without calling the handler.
pub fn typed<H: TypedHandler>(handler: H) -> Typed<H> {
    Typed(handler)
}

impl<H: TypedHandler> Handler for Typed<H> {
    fn handle(&self, req: HandlerRequest) -> anyhow::Result<HandlerResponse> {
        let data = match serde_json::from_value::<H::Request>(request_data(&req)) {
            Ok(data) => data,
            Err(err) => {
                debug!(
                    operation_id = %req.operation_id,
                    error = %err,
                    "Typed request extraction failed"
                );
                return Ok(HandlerResponse::json(
                    400,
                    serde_json::json!({
                        "error": "Invalid request data",
                        "message": err.to_string()
                    }),
                ));
            }
        };

        let typed_req = TypedRequest {
            request_id: req.request_id,
            method: req.method,
            path: req.path,
            headers: req.headers,
            data,
        };
        let resp = self.0.handle(typed_req)?;
        let body = serde_json::to_value(resp.body).context("failed to serialize typed response")?;
        Ok(HandlerResponse::json(resp.status, body))
    }
}
