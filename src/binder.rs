//! # Operation Binder
//!
//! Walks every `(path, method, operation)` of a [`Description`] in document
//! order and registers one route per operation that has both an
//! `operationId` and a handler in the [`HandlerRegistry`]. Everything else is
//! skipped and recorded in the [`BindReport`].
//!
//! The router is reached only through the [`RouteRegistrar`] trait, so the
//! binder can be exercised against a recording registrar in tests:
//!
//! ```rust
//! use oasbind::binder::{OperationBinder, RouteRegistrar, RouteRegistration};
//! use oasbind::registry::{HandlerRegistry, HandlerRequest, Reply};
//! use oasbind::spec::{parse_description, Format};
//!
//! #[derive(Default)]
//! struct Recorder(Vec<String>);
//!
//! impl RouteRegistrar for Recorder {
//!     type Error = std::convert::Infallible;
//!     fn register(&mut self, route: RouteRegistration) -> Result<(), Self::Error> {
//!         self.0.push(format!("{} {}", route.method, route.path));
//!         Ok(())
//!     }
//! }
//!
//! let description = parse_description(r#"
//! openapi: 3.0.0
//! info: { title: Pets, version: "1" }
//! paths:
//!   /pets/{petId}:
//!     get:
//!       operationId: showPetById
//!       responses: { "200": { description: ok } }
//! "#, Format::Yaml).unwrap();
//!
//! let registry = HandlerRegistry::builder()
//!     .register("showPetById", |_req: HandlerRequest| Reply::new().send(()))
//!     .build()
//!     .unwrap();
//!
//! let mut recorder = Recorder::default();
//! let report = OperationBinder::new(&description, &registry).bind(&mut recorder).unwrap();
//! assert_eq!(recorder.0, vec!["GET /pets/:petId"]);
//! assert_eq!(report.bound.len(), 1);
//! ```

use crate::path::{placeholder_names, to_router_path};
use crate::registry::{HandlerRegistry, SharedHandler};
use crate::schema::{derive_schema, DeriveError, MediaTypePolicy, RouteSchema};
use crate::spec::Description;
use http::Method;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One route handed to the router. Owned by the registrar once registered.
pub struct RouteRegistration {
    /// Upper-case method token
    pub method: Method,
    /// Path in router syntax (`/pets/:petId`)
    pub path: String,
    pub schema: RouteSchema,
    pub handler: SharedHandler,
    pub operation_id: String,
}

impl fmt::Debug for RouteRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRegistration")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("operation_id", &self.operation_id)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Anything that accepts route registrations.
pub trait RouteRegistrar {
    type Error: std::error::Error + Send + Sync + 'static;

    fn register(&mut self, route: RouteRegistration) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BindOptions {
    pub media_types: MediaTypePolicy,
    /// Fail when the registry holds handlers for ids the description never declares.
    pub strict_registry: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundRoute {
    pub method: Method,
    /// Path template as declared in the description
    pub path: String,
    pub router_path: String,
    pub operation_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingOperationId,
    NoHandler,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedOperation {
    pub method: Method,
    pub path: String,
    pub operation_id: Option<String>,
    pub reason: SkipReason,
}

/// Outcome of a successful binding pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Registered routes in registration order
    pub bound: Vec<BoundRoute>,
    pub skipped: Vec<SkippedOperation>,
    /// Registry ids that match no operation in the description
    pub unused_handlers: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("no API: the description declares no paths")]
    NoPaths,
    #[error("invalid HTTP method `{method}` under {path}")]
    InvalidMethod { method: String, path: String },
    #[error(transparent)]
    Derive(#[from] DeriveError),
    #[error("failed to register {method} {path}: {source}")]
    Registration {
        method: Method,
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("handlers registered for unknown operations: {}", .0.join(", "))]
    UnknownHandlers(Vec<String>),
}

/// Binds the operations of one description against one registry.
#[derive(Debug)]
pub struct OperationBinder<'a> {
    description: &'a Description,
    registry: &'a HandlerRegistry,
    options: BindOptions,
}

impl<'a> OperationBinder<'a> {
    #[must_use]
    pub fn new(description: &'a Description, registry: &'a HandlerRegistry) -> Self {
        Self {
            description,
            registry,
            options: BindOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BindOptions) -> Self {
        self.options = options;
        self
    }

    /// Register every eligible operation with `registrar`.
    ///
    /// A single pass with no rollback: when an error is returned the
    /// registrar may already hold some routes and should be discarded.
    ///
    /// # Errors
    ///
    /// [`BindError::NoPaths`] when the description has no `paths`,
    /// [`BindError::UnknownHandlers`] in strict registry mode, and any
    /// derivation or registration failure.
    pub fn bind<R: RouteRegistrar>(self, registrar: &mut R) -> Result<BindReport, BindError> {
        let paths = self.description.paths.as_ref().ok_or(BindError::NoPaths)?;

        let unused_handlers: Vec<String> = self
            .registry
            .operation_ids()
            .filter(|id| !self.description.declares_operation(id))
            .map(str::to_string)
            .collect();
        if !unused_handlers.is_empty() {
            if self.options.strict_registry {
                return Err(BindError::UnknownHandlers(unused_handlers));
            }
            warn!(
                operation_ids = ?unused_handlers,
                "Handlers registered for operations the description does not declare"
            );
        }

        let mut report = BindReport {
            unused_handlers,
            ..BindReport::default()
        };

        for (path, item) in paths {
            for (method_key, operation) in &item.operations {
                let method = Method::from_bytes(method_key.to_ascii_uppercase().as_bytes())
                    .map_err(|_| BindError::InvalidMethod {
                        method: method_key.clone(),
                        path: path.clone(),
                    })?;

                let Some(operation_id) = operation.operation_id.as_deref() else {
                    debug!(method = %method, path = %path, "Skipping operation without operationId");
                    report.skipped.push(SkippedOperation {
                        method,
                        path: path.clone(),
                        operation_id: None,
                        reason: SkipReason::MissingOperationId,
                    });
                    continue;
                };
                let Some(handler) = self.registry.get(operation_id) else {
                    debug!(
                        method = %method,
                        path = %path,
                        operation_id = %operation_id,
                        "No handler registered, operation not routed"
                    );
                    report.skipped.push(SkippedOperation {
                        method,
                        path: path.clone(),
                        operation_id: Some(operation_id.to_string()),
                        reason: SkipReason::NoHandler,
                    });
                    continue;
                };

                let operation = operation.with_path_parameters(&item.parameters);
                let schema = derive_schema(&operation, self.options.media_types)?;
                let router_path = to_router_path(path).into_owned();
                warn_on_placeholder_mismatch(path, operation_id, &schema);

                registrar
                    .register(RouteRegistration {
                        method: method.clone(),
                        path: router_path.clone(),
                        schema,
                        handler: Arc::clone(handler),
                        operation_id: operation_id.to_string(),
                    })
                    .map_err(|e| BindError::Registration {
                        method: method.clone(),
                        path: router_path.clone(),
                        source: Box::new(e),
                    })?;

                info!(
                    method = %method,
                    path = %router_path,
                    operation_id = %operation_id,
                    "Route bound"
                );
                report.bound.push(BoundRoute {
                    method,
                    path: path.clone(),
                    router_path,
                    operation_id: operation_id.to_string(),
                });
            }
        }

        info!(
            bound = report.bound.len(),
            skipped = report.skipped.len(),
            "Operation binding complete"
        );
        Ok(report)
    }
}

fn warn_on_placeholder_mismatch(path: &str, operation_id: &str, schema: &RouteSchema) {
    let placeholders = placeholder_names(path);
    let declared: Vec<&str> = schema.params.properties().keys().map(String::as_str).collect();
    let undeclared: Vec<&str> = placeholders
        .iter()
        .copied()
        .filter(|p| !declared.contains(p))
        .collect();
    let unused: Vec<&str> = declared
        .iter()
        .copied()
        .filter(|d| !placeholders.contains(d))
        .collect();
    if !undeclared.is_empty() || !unused.is_empty() {
        warn!(
            path = %path,
            operation_id = %operation_id,
            undeclared = ?undeclared,
            unused = ?unused,
            "Path placeholders and declared path parameters differ"
        );
    }
}
