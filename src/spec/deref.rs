use super::LoadError;
use serde_json::{Map, Value};

/// Replace every local `$ref` reachable from `paths` with the value it points at.
///
/// Only the `paths` subtree is rewritten; `components` stay as declared, so a
/// self-referencing schema that no operation uses does not fail the load.
/// Sibling keys next to a `$ref` (allowed by OpenAPI 3.1) are layered on top
/// of the resolved object.
///
/// # Errors
///
/// * [`LoadError::UnresolvedReference`] for external references or pointers
///   that do not resolve inside the document
/// * [`LoadError::CircularReference`] when resolving a reference leads back to itself
pub fn dereference(mut document: Value) -> Result<Value, LoadError> {
    let paths = match document.get("paths") {
        Some(paths) => expand(&document, paths, &mut Vec::new())?,
        None => return Ok(document),
    };
    if let Value::Object(root) = &mut document {
        root.insert("paths".to_string(), paths);
    }
    Ok(document)
}

fn expand(root: &Value, value: &Value, stack: &mut Vec<String>) -> Result<Value, LoadError> {
    match value {
        Value::Object(obj) => {
            if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
                return expand_reference(root, obj, reference, stack);
            }
            let mut out = Map::with_capacity(obj.len());
            for (key, v) in obj {
                out.insert(key.clone(), expand(root, v, stack)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|v| expand(root, v, stack))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

fn expand_reference(
    root: &Value,
    obj: &Map<String, Value>,
    reference: &str,
    stack: &mut Vec<String>,
) -> Result<Value, LoadError> {
    let unresolved = || LoadError::UnresolvedReference {
        reference: reference.to_string(),
    };
    let fragment = reference.strip_prefix('#').ok_or_else(unresolved)?;
    // URI fragment: `%7B` and friends are legal in path item pointers
    let pointer = urlencoding::decode(fragment).map_err(|_| unresolved())?;
    if stack.iter().any(|r| r == reference) {
        return Err(LoadError::CircularReference {
            reference: reference.to_string(),
        });
    }
    let target = root.pointer(&pointer).ok_or_else(unresolved)?;

    stack.push(reference.to_string());
    let resolved = expand(root, target, stack);
    stack.pop();
    let mut resolved = resolved?;

    if let Value::Object(target_obj) = &mut resolved {
        for (key, v) in obj {
            if key != "$ref" {
                target_obj.insert(key.clone(), expand(root, v, stack)?);
            }
        }
    }
    Ok(resolved)
}
