//! # Schema Deriver
//!
//! Turns one [`Operation`] into the validation schema a route is registered
//! with: one object schema per parameter location (`params`, `querystring`,
//! `headers`), plus `body` and per-status `response` schemas when the
//! operation declares them.
//!
//! ```rust
//! use oasbind::schema::{derive_schema, MediaTypePolicy};
//! use oasbind::spec::Operation;
//! use serde_json::json;
//!
//! let op: Operation = serde_json::from_value(json!({
//!     "operationId": "showPetById",
//!     "parameters": [
//!         { "name": "petId", "in": "path", "required": true, "schema": { "type": "string" } }
//!     ]
//! })).unwrap();
//!
//! let schema = derive_schema(&op, MediaTypePolicy::Single).unwrap();
//! assert!(schema.params.properties().contains_key("petId"));
//! assert!(schema.body.is_none());
//! ```

use crate::spec::{ContentMap, Operation, Parameter, ParameterLocation};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;

/// Rule for picking the schema out of a content map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MediaTypePolicy {
    /// Exactly one media type may be declared; more is an error.
    #[default]
    Single,
    /// Use the first media type in declaration order, ignore the rest.
    #[serde(alias = "first-declared")]
    #[value(name = "first")]
    First,
}

/// Which part of an operation a content map belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Param(String),
    Body,
    Response(String),
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Param(name) => write!(f, "param `{name}`"),
            ContentKind::Body => write!(f, "body"),
            ContentKind::Response(status) => write!(f, "response {status}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeriveError {
    #[error("operation `{operation}`: {kind} declares an empty content map")]
    EmptyContent { operation: String, kind: ContentKind },
    #[error(
        "operation `{operation}`: {kind} declares {} media types ({}); exactly one is supported",
        .media_types.len(),
        .media_types.join(", ")
    )]
    AmbiguousContent {
        operation: String,
        kind: ContentKind,
        media_types: Vec<String>,
    },
}

/// `{ "type": "object", "properties": {...}, "required": [...] }`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    properties: IndexMap<String, Value>,
    required: Vec<String>,
}

impl ObjectSchema {
    fn insert(&mut self, name: &str, schema: Value, required: bool) {
        self.properties.insert(name.to_string(), schema);
        if required && !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }
}

/// Validation schema for one route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteSchema {
    pub params: ObjectSchema,
    pub querystring: ObjectSchema,
    pub headers: ObjectSchema,
    pub body: Option<Value>,
    /// `requestBody.required`; not part of [`to_value`](Self::to_value)
    pub body_required: bool,
    /// Status code (or `default` / `2XX`) → schema, in declaration order
    pub response: Option<IndexMap<String, Value>>,
}

impl RouteSchema {
    /// Router-facing JSON form. `params`, `querystring` and `headers` are
    /// always present; `body` and `response` only when declared.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("params".to_string(), self.params.to_value());
        out.insert("querystring".to_string(), self.querystring.to_value());
        out.insert("headers".to_string(), self.headers.to_value());
        if let Some(body) = &self.body {
            out.insert("body".to_string(), body.clone());
        }
        if let Some(response) = &self.response {
            let map: Map<String, Value> = response
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            out.insert("response".to_string(), Value::Object(map));
        }
        Value::Object(out)
    }
}

/// Pick the one schema a content map contributes.
///
/// Returns `Ok(None)` when the selected media type carries no schema.
fn select_schema(
    content: &ContentMap,
    policy: MediaTypePolicy,
    operation: &Operation,
    kind: ContentKind,
) -> Result<Option<Value>, DeriveError> {
    if policy == MediaTypePolicy::Single && content.len() > 1 {
        return Err(DeriveError::AmbiguousContent {
            operation: operation.label().to_string(),
            kind,
            media_types: content.keys().cloned().collect(),
        });
    }
    match content.first() {
        Some((_, media)) => Ok(media.schema.clone()),
        None => Err(DeriveError::EmptyContent {
            operation: operation.label().to_string(),
            kind,
        }),
    }
}

fn parameter_schema(
    param: &Parameter,
    policy: MediaTypePolicy,
    operation: &Operation,
) -> Result<Value, DeriveError> {
    if let Some(schema) = &param.schema {
        return Ok(schema.clone());
    }
    let from_content = match &param.content {
        Some(content) => select_schema(
            content,
            policy,
            operation,
            ContentKind::Param(param.name.clone()),
        )?,
        None => None,
    };
    // No schema at all: accept any value but keep the name known.
    Ok(from_content.unwrap_or_else(|| Value::Object(Map::new())))
}

/// Derive the validation schema of one operation.
///
/// Parameters are classified by `in`; cookie (and unknown) locations are
/// ignored. Path parameters are always listed as required.
///
/// # Errors
///
/// [`DeriveError::EmptyContent`] when a content map has no media type, and
/// [`DeriveError::AmbiguousContent`] when [`MediaTypePolicy::Single`] is in
/// force and a content map lists several.
pub fn derive_schema(
    operation: &Operation,
    policy: MediaTypePolicy,
) -> Result<RouteSchema, DeriveError> {
    let mut schema = RouteSchema::default();

    for param in &operation.parameters {
        let target = match param.location {
            ParameterLocation::Path => &mut schema.params,
            ParameterLocation::Query => &mut schema.querystring,
            ParameterLocation::Header => &mut schema.headers,
            ParameterLocation::Cookie | ParameterLocation::Other => continue,
        };
        let fragment = parameter_schema(param, policy, operation)?;
        let required = param.required || param.location == ParameterLocation::Path;
        target.insert(&param.name, fragment, required);
    }

    if let Some(body) = &operation.request_body {
        schema.body = select_schema(&body.content, policy, operation, ContentKind::Body)?;
        schema.body_required = body.required;
    }

    if let Some(responses) = &operation.responses {
        let mut by_status = IndexMap::new();
        for (status, response) in responses {
            let Some(content) = &response.content else {
                continue;
            };
            let selected = select_schema(
                content,
                policy,
                operation,
                ContentKind::Response(status.clone()),
            )?;
            if let Some(s) = selected {
                by_status.insert(status.clone(), s);
            }
        }
        if !by_status.is_empty() {
            schema.response = Some(by_status);
        }
    }

    Ok(schema)
}
