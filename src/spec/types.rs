use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Path-item keys that declare an operation. Anything else under a path item
/// (`summary`, `servers`, `x-*`, ...) is not an operation.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Mapping from media type (e.g. `application/json`) to its body description.
///
/// Iteration order is declaration order in the source document.
pub type ContentMap = IndexMap<String, MediaType>;

/// A loaded, validated and dereferenced API description.
#[derive(Debug, Clone, Deserialize)]
pub struct Description {
    /// Declared OpenAPI version (`3.0.x` / `3.1.x`)
    pub openapi: String,
    pub info: Info,
    /// Path template → path item, in declaration order
    #[serde(default)]
    pub paths: Option<IndexMap<String, PathItem>>,
}

impl Description {
    /// Iterate over every `(path, method, operation)` triple in document order.
    pub fn operations(&self) -> impl Iterator<Item = (&str, &str, &Operation)> {
        self.paths.iter().flat_map(|paths| {
            paths.iter().flat_map(|(path, item)| {
                item.operations
                    .iter()
                    .map(move |(method, op)| (path.as_str(), method.as_str(), op))
            })
        })
    }

    /// Whether any operation in the document declares the given `operationId`.
    #[must_use]
    pub fn declares_operation(&self, operation_id: &str) -> bool {
        self.operations()
            .any(|(_, _, op)| op.operation_id.as_deref() == Some(operation_id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
}

/// One entry of the `paths` object.
#[derive(Debug, Clone, Default)]
pub struct PathItem {
    /// Parameters shared by every operation under this path
    pub parameters: Vec<Parameter>,
    /// `(method key as declared, operation)` in declaration order
    pub operations: Vec<(String, Operation)>,
}

impl<'de> Deserialize<'de> for PathItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        let mut item = PathItem::default();
        for (key, value) in raw {
            let lower = key.to_ascii_lowercase();
            if lower == "parameters" {
                item.parameters = serde_json::from_value(value).map_err(D::Error::custom)?;
            } else if HTTP_METHODS.contains(&lower.as_str()) {
                let operation = serde_json::from_value(value)
                    .map_err(|e| D::Error::custom(format!("{key}: {e}")))?;
                item.operations.push((key, operation));
            }
        }
        Ok(item)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub request_body: Option<RequestBody>,
    /// Status code (or `default`) → response, in declaration order
    #[serde(default)]
    pub responses: Option<IndexMap<String, Response>>,
}

impl Operation {
    /// Return a copy of this operation with path-level parameters merged in.
    ///
    /// Path-level parameters come first; an operation-level parameter with the
    /// same `(name, in)` pair replaces the shared one in place.
    #[must_use]
    pub fn with_path_parameters(&self, shared: &[Parameter]) -> Operation {
        if shared.is_empty() {
            return self.clone();
        }
        let mut parameters: Vec<Parameter> = shared.to_vec();
        for param in &self.parameters {
            match parameters
                .iter_mut()
                .find(|p| p.name == param.name && p.location == param.location)
            {
                Some(existing) => *existing = param.clone(),
                None => parameters.push(param.clone()),
            }
        }
        Operation {
            parameters,
            ..self.clone()
        }
    }

    /// `operationId` or a placeholder for diagnostics.
    #[must_use]
    pub fn label(&self) -> &str {
        self.operation_id.as_deref().unwrap_or("<unnamed>")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
            ParameterLocation::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub schema: Option<Value>,
    /// Alternative to `schema` for complex parameters
    #[serde(default)]
    pub content: Option<ContentMap>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub content: ContentMap,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: Option<String>,
    /// Absent for bodiless responses such as `204`
    #[serde(default)]
    pub content: Option<ContentMap>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_item_keeps_method_order_and_ignores_extras() {
        let item: PathItem = serde_json::from_value(json!({
            "summary": "pets",
            "post": { "operationId": "createPets" },
            "x-internal": true,
            "get": { "operationId": "listPets" }
        }))
        .unwrap();
        let methods: Vec<&str> = item.operations.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(methods, vec!["post", "get"]);
    }

    #[test]
    fn test_unknown_parameter_location() {
        let p: Parameter =
            serde_json::from_value(json!({ "name": "x", "in": "matrix" })).unwrap();
        assert_eq!(p.location, ParameterLocation::Other);
    }

    #[test]
    fn test_operation_parameters_override_path_parameters() {
        let shared: Vec<Parameter> = serde_json::from_value(json!([
            { "name": "petId", "in": "path", "required": true, "schema": { "type": "string" } },
            { "name": "trace", "in": "header", "schema": { "type": "string" } }
        ]))
        .unwrap();
        let op: Operation = serde_json::from_value(json!({
            "operationId": "showPetById",
            "parameters": [
                { "name": "petId", "in": "path", "required": true, "schema": { "type": "integer" } },
                { "name": "verbose", "in": "query", "schema": { "type": "boolean" } }
            ]
        }))
        .unwrap();

        let merged = op.with_path_parameters(&shared);
        let names: Vec<&str> = merged.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["petId", "trace", "verbose"]);
        assert_eq!(merged.parameters[0].schema, Some(json!({ "type": "integer" })));
    }
}
