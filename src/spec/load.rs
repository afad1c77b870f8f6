use super::deref::dereference;
use super::types::{Description, HTTP_METHODS};
use super::LoadError;
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Serialization format of a description file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// `.yaml` / `.yml` are YAML, everything else is treated as JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }
}

/// Drop path-item keys that are neither operations nor standard path-item
/// fields so the strict OpenAPI model accepts vendor-decorated documents.
fn strip_unknown_verbs(val: &mut Value) {
    if let Some(Value::Object(paths_map)) = val.get_mut("paths") {
        for item in paths_map.values_mut() {
            if let Value::Object(obj) = item {
                obj.retain(|k, _| {
                    let lk = k.to_ascii_lowercase();
                    match lk.as_str() {
                        "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                        m if HTTP_METHODS.contains(&m) => true,
                        _ => k.starts_with("x-"),
                    }
                });
            }
        }
    }
}

/// Check the raw document against the OpenAPI 3 model.
fn validate(value: &Value) -> Result<(), LoadError> {
    let version = value
        .get("openapi")
        .and_then(Value::as_str)
        .ok_or_else(|| LoadError::Invalid("missing `openapi` version field".to_string()))?;
    if !version.starts_with("3.") {
        return Err(LoadError::Invalid(format!(
            "unsupported OpenAPI version `{version}`, expected 3.x"
        )));
    }

    let mut normalized = value.clone();
    strip_unknown_verbs(&mut normalized);
    let spec: OpenApiV3Spec =
        serde_json::from_value(normalized).map_err(|e| LoadError::Invalid(e.to_string()))?;
    debug!(
        title = %spec.info.title,
        version = %spec.info.version,
        "API description passed OpenAPI validation"
    );
    Ok(())
}

/// Parse, validate and dereference a description from its textual form.
///
/// # Errors
///
/// Returns [`LoadError::Parse`] for malformed YAML/JSON, [`LoadError::Invalid`]
/// when the document is not an OpenAPI 3 description, and the reference errors
/// from dereferencing.
pub fn parse_description(content: &str, format: Format) -> Result<Description, LoadError> {
    let value: Value = match format {
        Format::Yaml => {
            serde_yaml::from_str(content).map_err(|e| LoadError::Parse(e.to_string()))?
        }
        Format::Json => {
            serde_json::from_str(content).map_err(|e| LoadError::Parse(e.to_string()))?
        }
    };
    description_from_value(value)
}

/// Validate and dereference an already parsed document.
///
/// # Errors
///
/// See [`parse_description`].
pub fn description_from_value(value: Value) -> Result<Description, LoadError> {
    validate(&value)?;
    let value = dereference(value)?;
    serde_json::from_value(value).map_err(|e| LoadError::Invalid(e.to_string()))
}

/// Read an API description file (YAML or JSON, chosen by extension).
///
/// # Errors
///
/// Returns [`LoadError::Read`] when the file cannot be read, plus every error
/// [`parse_description`] can produce.
pub fn load_description(path: impl AsRef<Path>) -> Result<Description, LoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_description(&content, Format::from_path(path))
}
