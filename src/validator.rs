//! # Validator
//!
//! Compiled JSON Schema validators for one route, built from its
//! [`RouteSchema`], plus the coercion of raw path/query/header strings into
//! the JSON types the schema declares.

use crate::schema::RouteSchema;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A schema section failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{section} schema does not compile: {message}")]
pub struct CompileError {
    pub section: String,
    pub message: String,
}

/// One compiled schema section (`params`, `body`, `response 200`, ...).
pub struct SectionValidator {
    schema: Value,
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for SectionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionValidator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl SectionValidator {
    /// # Errors
    ///
    /// Returns [`CompileError`] when `schema` is not a valid JSON Schema.
    pub fn compile(section: &str, schema: Value) -> Result<Self, CompileError> {
        let validator = jsonschema::validator_for(&schema).map_err(|e| CompileError {
            section: section.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { schema, validator })
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Schema of one property of an object schema.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.schema.get("properties").and_then(|p| p.get(name))
    }

    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Human-readable validation errors; empty when `instance` is valid.
    #[must_use]
    pub fn errors(&self, instance: &Value) -> Vec<String> {
        self.validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect()
    }
}

/// All validators of one route.
#[derive(Debug)]
pub struct RouteValidators {
    pub params: SectionValidator,
    pub querystring: SectionValidator,
    /// Compiled with lower-cased property names
    pub headers: SectionValidator,
    pub body: Option<SectionValidator>,
    pub responses: IndexMap<String, SectionValidator>,
}

impl RouteValidators {
    /// # Errors
    ///
    /// Returns the first section whose schema fails to compile.
    pub fn compile(schema: &RouteSchema) -> Result<Self, CompileError> {
        let body = schema
            .body
            .clone()
            .map(|b| SectionValidator::compile("body", b))
            .transpose()?;
        let mut responses = IndexMap::new();
        if let Some(by_status) = &schema.response {
            for (status, s) in by_status {
                let section = format!("response {status}");
                responses.insert(status.clone(), SectionValidator::compile(&section, s.clone())?);
            }
        }
        Ok(Self {
            params: SectionValidator::compile("params", schema.params.to_value())?,
            querystring: SectionValidator::compile("querystring", schema.querystring.to_value())?,
            headers: SectionValidator::compile(
                "headers",
                lowercase_names(schema.headers.to_value()),
            )?,
            body,
            responses,
        })
    }

    /// Response validator for `status`: exact code first, then its `NXX`
    /// range, then `default`.
    #[must_use]
    pub fn response_for(&self, status: u16) -> Option<&SectionValidator> {
        let exact = status.to_string();
        let range = format!("{}XX", status / 100);
        self.responses
            .get(&exact)
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(&range))
                    .map(|(_, v)| v)
            })
            .or_else(|| self.responses.get("default"))
    }
}

/// Lower-case the property names and `required` entries of an object schema.
fn lowercase_names(mut schema: Value) -> Value {
    if let Some(props) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        let lowered: Map<String, Value> = std::mem::take(props)
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        *props = lowered;
    }
    if let Some(required) = schema.get_mut("required").and_then(Value::as_array_mut) {
        for r in required.iter_mut() {
            if let Value::String(s) = r {
                *s = s.to_ascii_lowercase();
            }
        }
    }
    schema
}

fn schema_type(schema: Option<&Value>) -> Option<&str> {
    schema.and_then(|s| s.get("type")).and_then(Value::as_str)
}

fn convert_primitive(raw: &str, schema: Option<&Value>) -> Value {
    match schema_type(schema) {
        Some("integer") => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Some("number") => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Some("boolean") => raw
            .parse::<bool>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        _ => Value::String(raw.to_string()),
    }
}

/// Convert one raw parameter string into the JSON type its schema declares.
///
/// Values that do not parse are kept as strings so that schema validation
/// reports them. Arrays use the comma-separated form (`1,2,3`); objects
/// are read as JSON.
#[must_use]
pub fn coerce_value(raw: &str, schema: Option<&Value>) -> Value {
    match schema_type(schema) {
        Some("array") => {
            let items = schema.and_then(|s| s.get("items"));
            Value::Array(
                raw.split(',')
                    .filter(|s| !s.is_empty())
                    .map(|p| convert_primitive(p.trim(), items))
                    .collect(),
            )
        }
        Some("object") => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        }
        _ => convert_primitive(raw, schema),
    }
}

/// Coerce a list of raw `(name, value)` pairs against an object schema.
///
/// Repeated names collect into an array when the property is declared as
/// an array (`?tag=a&tag=b`); otherwise the last occurrence wins.
#[must_use]
pub fn coerce_section(raw: &[(String, String)], section: &SectionValidator) -> Map<String, Value> {
    let mut out = Map::new();
    for (name, value) in raw {
        let schema = section.property(name);
        let coerced = coerce_value(value, schema);
        match (schema_type(schema), out.get_mut(name)) {
            (Some("array"), Some(Value::Array(existing))) => {
                if let Value::Array(more) = coerced {
                    existing.extend(more);
                }
            }
            _ => {
                out.insert(name.clone(), coerced);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{derive_schema, MediaTypePolicy};
    use crate::spec::Operation;
    use serde_json::json;

    fn validators(op: Value) -> RouteValidators {
        let op: Operation = serde_json::from_value(op).unwrap();
        RouteValidators::compile(&derive_schema(&op, MediaTypePolicy::Single).unwrap()).unwrap()
    }

    #[test]
    fn test_coerce_primitives() {
        assert_eq!(coerce_value("42", Some(&json!({ "type": "integer" }))), json!(42));
        assert_eq!(coerce_value("1.5", Some(&json!({ "type": "number" }))), json!(1.5));
        assert_eq!(coerce_value("true", Some(&json!({ "type": "boolean" }))), json!(true));
        assert_eq!(coerce_value("abc", Some(&json!({ "type": "integer" }))), json!("abc"));
        assert_eq!(coerce_value("abc", None), json!("abc"));
    }

    #[test]
    fn test_coerce_array_and_object() {
        let schema = json!({ "type": "array", "items": { "type": "integer" } });
        assert_eq!(coerce_value("1,2,3", Some(&schema)), json!([1, 2, 3]));
        assert_eq!(
            coerce_value(r#"{"a":1}"#, Some(&json!({ "type": "object" }))),
            json!({ "a": 1 })
        );
    }

    #[test]
    fn test_repeated_query_keys() {
        let v = validators(json!({
            "operationId": "search",
            "parameters": [
                { "name": "tag", "in": "query", "schema": { "type": "array", "items": { "type": "string" } } },
                { "name": "limit", "in": "query", "schema": { "type": "integer" } }
            ]
        }));
        let raw = vec![
            ("tag".to_string(), "a".to_string()),
            ("limit".to_string(), "5".to_string()),
            ("tag".to_string(), "b".to_string()),
            ("limit".to_string(), "7".to_string()),
        ];
        let coerced = coerce_section(&raw, &v.querystring);
        assert_eq!(Value::Object(coerced), json!({ "tag": ["a", "b"], "limit": 7 }));
    }

    #[test]
    fn test_header_names_are_lowercased() {
        let v = validators(json!({
            "operationId": "traced",
            "parameters": [
                { "name": "X-Trace", "in": "header", "required": true, "schema": { "type": "string" } }
            ]
        }));
        assert!(v.headers.is_valid(&json!({ "x-trace": "abc" })));
        assert!(!v.headers.is_valid(&json!({})));
    }

    #[test]
    fn test_required_params_enforced() {
        let v = validators(json!({
            "operationId": "showPetById",
            "parameters": [
                { "name": "petId", "in": "path", "schema": { "type": "integer" } }
            ]
        }));
        assert!(v.params.is_valid(&json!({ "petId": 3 })));
        assert!(!v.params.errors(&json!({ "petId": "x" })).is_empty());
        assert!(!v.params.is_valid(&json!({})));
    }

    #[test]
    fn test_response_lookup_order() {
        let v = validators(json!({
            "operationId": "listPets",
            "responses": {
                "200": { "description": "ok", "content": { "application/json": { "schema": { "type": "array" } } } },
                "4XX": { "description": "client", "content": { "application/json": { "schema": { "type": "object" } } } },
                "default": { "description": "other", "content": { "application/json": { "schema": { "type": "string" } } } }
            }
        }));
        assert_eq!(v.response_for(200).unwrap().schema(), &json!({ "type": "array" }));
        assert_eq!(v.response_for(404).unwrap().schema(), &json!({ "type": "object" }));
        assert_eq!(v.response_for(500).unwrap().schema(), &json!({ "type": "string" }));
    }

    #[test]
    fn test_invalid_schema_does_not_compile() {
        let err = SectionValidator::compile("body", json!({ "type": 12 })).unwrap_err();
        assert_eq!(err.section, "body");
    }
}
