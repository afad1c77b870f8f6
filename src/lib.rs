//! # oasbind
//!
//! **oasbind** turns an [OpenAPI 3](https://spec.openapis.org/oas/v3.1.0)
//! description into a running HTTP server on the `may` coroutine runtime.
//! Every operation that has an `operationId` and a registered handler becomes
//! one route, validated against a schema derived from the operation itself.
//!
//! ## Architecture
//!
//! - **[`spec`]** - loading, validation and `$ref` resolution of descriptions
//! - **[`schema`]** - derivation of the per-route validation schema
//! - **[`path`]** - `{param}` to `:param` path translation
//! - **[`registry`]** - the handler contract and the `operationId` lookup table
//! - **[`typed`]** - handlers with typed request and response structs
//! - **[`binder`]** - the binding pass and the [`RouteRegistrar`](binder::RouteRegistrar) seam
//! - **[`router`]** - route table, path matching, compiled validators
//! - **[`validator`]** - JSON Schema validation and parameter coercion
//! - **[`server`]** - `may_minihttp` service and request pipeline
//! - **[`bootstrap`]** - startup sequence returning errors instead of exiting
//! - **[`config`]** / **[`logging`]** - CLI, file and environment configuration; tracing setup
//!
//! ### Binding Flow
//!
//! ```text
//! description ──► (path, method, operation) ──► operationId in registry?
//!                                                   │ no: skipped
//!                                                   ▼ yes
//!                              derive_schema + to_router_path
//!                                                   │
//!                                                   ▼
//!                              RouteRegistrar::register(method, path, schema, handler)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use oasbind::binder::OperationBinder;
//! use oasbind::registry::{HandlerRegistry, HandlerRequest, Reply};
//! use oasbind::router::Router;
//! use oasbind::spec::{parse_description, Format};
//! use serde_json::json;
//!
//! let description = parse_description(r#"
//! openapi: 3.0.0
//! info: { title: Pets, version: "1.0.0" }
//! paths:
//!   /pets:
//!     get:
//!       operationId: listPets
//!       responses:
//!         "200":
//!           description: ok
//!           content:
//!             application/json:
//!               schema: { type: array }
//! "#, Format::Yaml).unwrap();
//!
//! let registry = HandlerRegistry::builder()
//!     .register("listPets", |_req: HandlerRequest| Reply::new().send(json!([])))
//!     .build()
//!     .unwrap();
//!
//! let mut router = Router::new();
//! let report = OperationBinder::new(&description, &registry).bind(&mut router).unwrap();
//! assert_eq!(report.bound[0].router_path, "/pets");
//! assert!(router.route(&Method::GET, "/pets").is_some());
//! ```

pub mod binder;
pub mod bootstrap;
pub mod config;
pub mod ids;
pub mod logging;
pub mod path;
pub mod registry;
pub mod router;
pub mod schema;
pub mod server;
pub mod spec;
pub mod typed;
pub mod validator;

pub use binder::{BindError, BindOptions, BindReport, OperationBinder, RouteRegistrar, RouteRegistration};
pub use registry::{Handler, HandlerRegistry, HandlerRequest, HandlerResponse, Reply};
pub use schema::{derive_schema, MediaTypePolicy, RouteSchema};
pub use spec::{load_description, Description};
