//! # Router Module
//!
//! Route table filled by the [`OperationBinder`](crate::binder::OperationBinder)
//! through the [`RouteRegistrar`](crate::binder::RouteRegistrar) trait.
//!
//! ## Architecture
//!
//! 1. **Registration**: each colon-style path (`/pets/:petId`) is compiled
//!    into an anchored regex, and every section of the route's derived schema
//!    is compiled into a JSON Schema validator. A second route with the same
//!    method and an equivalent path is rejected.
//!
//! 2. **Matching**: requests are tested against the routes in registration
//!    order; the first route whose method and pattern match wins.
//!
//! ```rust
//! use http::Method;
//! use oasbind::binder::OperationBinder;
//! use oasbind::registry::{HandlerRegistry, HandlerRequest, Reply};
//! use oasbind::router::Router;
//! use oasbind::spec::{parse_description, Format};
//!
//! let description = parse_description(r#"
//! openapi: 3.0.0
//! info: { title: Pets, version: "1" }
//! paths:
//!   /pets/{petId}:
//!     get:
//!       operationId: showPetById
//!       parameters:
//!         - { name: petId, in: path, required: true, schema: { type: integer } }
//!       responses: { "200": { description: ok } }
//! "#, Format::Yaml).unwrap();
//! let registry = HandlerRegistry::builder()
//!     .register("showPetById", |_req: HandlerRequest| Reply::new().send(()))
//!     .build()
//!     .unwrap();
//!
//! let mut router = Router::new();
//! OperationBinder::new(&description, &registry).bind(&mut router).unwrap();
//!
//! let m = router.route(&Method::GET, "/pets/42").unwrap();
//! assert_eq!(m.route.operation_id, "showPetById");
//! assert_eq!(m.path_param("petId"), Some("42"));
//! assert!(router.route(&Method::POST, "/pets/42").is_none());
//! ```

mod core;

pub use self::core::{path_to_regex, path_to_regex_with_params, Route, RouteMatch, Router, RouterError};
