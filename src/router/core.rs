use crate::binder::{RouteRegistrar, RouteRegistration};
use crate::registry::SharedHandler;
use crate::schema::RouteSchema;
use crate::validator::{CompileError, RouteValidators};
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

#[allow(clippy::expect_used)]
static COLON_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([\w-]+)").expect("colon parameter regex must compile"));

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("route conflict: {method} {path} is already registered by `{existing}`")]
    Conflict {
        method: Method,
        path: String,
        existing: String,
    },
    #[error("operation `{operation_id}`: {source}")]
    InvalidSchema {
        operation_id: String,
        #[source]
        source: CompileError,
    },
    #[error("path `{path}` cannot be compiled: {message}")]
    InvalidPath { path: String, message: String },
}

/// A registered route.
pub struct Route {
    pub method: Method,
    /// Colon-style path as registered
    pub path: String,
    pub operation_id: String,
    pub schema: RouteSchema,
    pub validators: RouteValidators,
    pub handler: SharedHandler,
    regex: Regex,
    param_names: Vec<String>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("operation_id", &self.operation_id)
            .field("regex", &self.regex.as_str())
            .finish_non_exhaustive()
    }
}

/// Result of matching a request path to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    /// Captured path parameters in path order
    pub path_params: Vec<(String, String)>,
}

impl RouteMatch {
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Convert a colon-style path to an anchored regex and its parameter names.
///
/// `/users/:id/posts/:postId` becomes `^/users/([^/]+)/posts/([^/]+)$`;
/// everything outside the placeholders is matched literally. A `:name` that
/// starts a segment is always a parameter. Inside a segment only names listed
/// in `declared` are, so `/users/:id:activate` with `declared = ["id"]` keeps
/// `:activate` as literal text.
///
/// # Errors
///
/// [`RouterError::InvalidPath`] when the resulting pattern does not compile.
pub fn path_to_regex_with_params(
    path: &str,
    declared: &[&str],
) -> Result<(Regex, Vec<String>), RouterError> {
    let mut pattern = String::with_capacity(path.len() + 8);
    pattern.push('^');
    let mut param_names = Vec::new();
    let mut last = 0;
    for caps in COLON_PARAM.captures_iter(path) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let starts_segment = path[..whole.start()].ends_with('/');
        if !starts_segment && !declared.contains(&name.as_str()) {
            continue;
        }
        pattern.push_str(&regex::escape(&path[last..whole.start()]));
        pattern.push_str("([^/]+)");
        param_names.push(name.as_str().to_string());
        last = whole.end();
    }
    pattern.push_str(&regex::escape(&path[last..]));
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|e| RouterError::InvalidPath {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    Ok((regex, param_names))
}

/// [`path_to_regex_with_params`] with no declared names: only segment-leading
/// `:name`s are parameters.
///
/// # Errors
///
/// [`RouterError::InvalidPath`] when the resulting pattern does not compile.
pub fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), RouterError> {
    path_to_regex_with_params(path, &[])
}

/// Route table matched in registration order.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Arc<Route>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(AsRef::as_ref)
    }

    /// Find the first route matching `method` and `path` (no query string).
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        for route in &self.routes {
            if route.method != *method {
                continue;
            }
            if let Some(captures) = route.regex.captures(path) {
                let path_params = route
                    .param_names
                    .iter()
                    .enumerate()
                    .filter_map(|(i, name)| {
                        captures
                            .get(i + 1)
                            .map(|v| (name.clone(), v.as_str().to_string()))
                    })
                    .collect();
                debug!(
                    method = %method,
                    path = %path,
                    operation_id = %route.operation_id,
                    route_pattern = %route.path,
                    "Route matched"
                );
                return Some(RouteMatch {
                    route: Arc::clone(route),
                    path_params,
                });
            }
        }
        debug!(method = %method, path = %path, "No route matched");
        None
    }
}

impl RouteRegistrar for Router {
    type Error = RouterError;

    fn register(&mut self, registration: RouteRegistration) -> Result<(), RouterError> {
        let RouteRegistration {
            method,
            path,
            schema,
            handler,
            operation_id,
        } = registration;

        let declared: Vec<&str> = schema.params.properties().keys().map(String::as_str).collect();
        let (regex, param_names) = path_to_regex_with_params(&path, &declared)?;
        if let Some(existing) = self
            .routes
            .iter()
            .find(|r| r.method == method && r.regex.as_str() == regex.as_str())
        {
            return Err(RouterError::Conflict {
                method,
                path,
                existing: existing.operation_id.clone(),
            });
        }

        let validators =
            RouteValidators::compile(&schema).map_err(|source| RouterError::InvalidSchema {
                operation_id: operation_id.clone(),
                source,
            })?;

        info!(
            method = %method,
            path = %path,
            operation_id = %operation_id,
            params = ?param_names,
            "Route registered"
        );
        self.routes.push(Arc::new(Route {
            method,
            path,
            operation_id,
            schema,
            validators,
            handler,
            regex,
            param_names,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{HandlerRequest, Reply};
    use serde_json::json;

    fn registration(method: Method, path: &str, operation_id: &str) -> RouteRegistration {
        RouteRegistration {
            method,
            path: path.to_string(),
            schema: RouteSchema::default(),
            handler: Arc::new(|_req: HandlerRequest| Reply::new().send(json!({}))),
            operation_id: operation_id.to_string(),
        }
    }

    #[test]
    fn test_path_to_regex() {
        let (re, params) = path_to_regex("/users/:id/posts/:postId").unwrap();
        assert_eq!(params, vec!["id", "postId"]);
        assert!(re.is_match("/users/1/posts/2"));
        assert!(!re.is_match("/users/1/posts"));
        assert!(!re.is_match("/users/1/posts/2/extra"));

        let (re, params) = path_to_regex("/files/:name.json").unwrap();
        assert_eq!(params, vec!["name"]);
        assert!(re.is_match("/files/a.json"));
        assert!(!re.is_match("/files/axjson"));
    }

    #[test]
    fn test_literal_colon_after_parameter() {
        let (re, params) = path_to_regex_with_params("/users/:id:activate", &["id"]).unwrap();
        assert_eq!(params, vec!["id"]);
        assert_eq!(re.as_str(), "^/users/([^/]+):activate$");
        assert!(!re.is_match("/users/42"));
        let caps = re.captures("/users/42:activate").unwrap();
        assert_eq!(&caps[1], "42");

        let (_, params) = path_to_regex_with_params("/files/:stem.:ext", &["stem", "ext"]).unwrap();
        assert_eq!(params, vec!["stem", "ext"]);
    }

    #[test]
    fn test_root_path() {
        let (re, params) = path_to_regex("/").unwrap();
        assert!(params.is_empty());
        assert!(re.is_match("/"));
        assert!(!re.is_match("/x"));
    }

    #[test]
    fn test_registration_order_decides_overlap() {
        let mut router = Router::new();
        router.register(registration(Method::GET, "/pets/mine", "mine")).unwrap();
        router.register(registration(Method::GET, "/pets/:petId", "byId")).unwrap();
        assert_eq!(router.route(&Method::GET, "/pets/mine").unwrap().route.operation_id, "mine");
        assert_eq!(router.route(&Method::GET, "/pets/7").unwrap().route.operation_id, "byId");
    }

    #[test]
    fn test_conflict_detected_for_equivalent_paths() {
        let mut router = Router::new();
        router.register(registration(Method::GET, "/pets/:id", "a")).unwrap();
        router.register(registration(Method::POST, "/pets/:id", "b")).unwrap();
        let err = router
            .register(registration(Method::GET, "/pets/:petId", "c"))
            .unwrap_err();
        assert!(matches!(err, RouterError::Conflict { ref existing, .. } if existing == "a"));
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let mut router = Router::new();
        let mut reg = registration(Method::POST, "/pets", "createPets");
        reg.schema.body = Some(json!({ "type": 5 }));
        let err = router.register(reg).unwrap_err();
        assert!(matches!(err, RouterError::InvalidSchema { ref operation_id, .. } if operation_id == "createPets"));
        assert!(router.is_empty());
    }
}
