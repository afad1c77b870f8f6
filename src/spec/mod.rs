//! # Spec Module
//!
//! Loading of OpenAPI 3 descriptions into the typed model consumed by the
//! [`schema`](crate::schema) deriver and the [`binder`](crate::binder).
//!
//! Loading happens in three steps:
//!
//! 1. **Parse** YAML or JSON into an order-preserving `serde_json::Value`
//! 2. **Validate** the document against the `oas3` OpenAPI model
//! 3. **Dereference** every local `$ref` under `paths`, then deserialize into
//!    [`Description`]
//!
//! Path, method and media-type maps keep the order they are declared in, so
//! route registration follows the document.

mod deref;
mod load;
mod types;

use std::path::PathBuf;

pub use deref::dereference;
pub use load::{description_from_value, load_description, parse_description, Format};
pub use types::*;

/// Failure to turn a description file into a [`Description`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read API description {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse API description: {0}")]
    Parse(String),
    #[error("invalid API description: {0}")]
    Invalid(String),
    #[error("unresolved reference `{reference}`")]
    UnresolvedReference { reference: String },
    #[error("circular reference `{reference}`")]
    CircularReference { reference: String },
}
