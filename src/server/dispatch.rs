//! Request pipeline between the HTTP service and the handlers.
//!
//! Kept free of any transport type so it can be driven directly from tests:
//! route lookup, parameter coercion, request validation, handler call and
//! response validation all happen in [`dispatch`].

use super::request::{ParsedRequest, RequestBody};
use crate::ids::RequestId;
use crate::registry::{HandlerRequest, HandlerResponse};
use crate::router::{RouteMatch, Router};
use crate::validator::{coerce_section, SectionValidator};
use http::Method;
use serde_json::{json, Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, info_span, warn};

fn validation_error(location: &str, details: Vec<String>) -> HandlerResponse {
    HandlerResponse::json(
        400,
        json!({
            "error": "Request validation failed",
            "location": location,
            "details": details,
        }),
    )
}

fn not_found(method: &str, path: &str) -> HandlerResponse {
    HandlerResponse::json(
        404,
        json!({ "error": "Not Found", "method": method, "path": path }),
    )
}

/// Coerce one section and validate it, or produce the 400 answer.
fn checked_section(
    location: &str,
    raw: &[(String, String)],
    validator: &SectionValidator,
) -> Result<Map<String, Value>, HandlerResponse> {
    let coerced = coerce_section(raw, validator);
    let instance = Value::Object(coerced);
    let details = validator.errors(&instance);
    if !details.is_empty() {
        return Err(validation_error(location, details));
    }
    match instance {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn build_request(
    route_match: &RouteMatch,
    req: ParsedRequest,
    method: Method,
    request_id: RequestId,
) -> Result<HandlerRequest, HandlerResponse> {
    let route = &route_match.route;
    let validators = &route.validators;

    let params = checked_section("params", &route_match.path_params, &validators.params)?;
    let query = checked_section("querystring", &req.query, &validators.querystring)?;
    let headers = checked_section("headers", &req.headers, &validators.headers)?;

    let body = match req.body {
        RequestBody::Invalid(message) => {
            return Err(HandlerResponse::json(
                400,
                json!({
                    "error": "Invalid JSON body",
                    "location": "body",
                    "details": [message],
                }),
            ));
        }
        RequestBody::Empty => {
            if route.schema.body_required {
                return Err(HandlerResponse::json(
                    400,
                    json!({
                        "error": "Request body required",
                        "location": "body",
                        "details": [],
                    }),
                ));
            }
            None
        }
        RequestBody::Json(value) => {
            if let Some(validator) = &validators.body {
                let details = validator.errors(&value);
                if !details.is_empty() {
                    return Err(validation_error("body", details));
                }
            }
            Some(value)
        }
    };

    Ok(HandlerRequest {
        request_id,
        method,
        path: req.path,
        operation_id: route.operation_id.clone(),
        params,
        query,
        headers,
        body,
    })
}

/// Answer one request.
///
/// Never fails: every problem becomes an HTTP status. `404` when no route
/// matches, `400` when the request does not satisfy the route's schema,
/// `500` when the handler errors or panics or its reply does not satisfy
/// the declared response schema.
pub fn dispatch(router: &Router, req: ParsedRequest) -> HandlerResponse {
    let request_id = RequestId::from_headers(&req.headers);
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method,
        path = %req.path
    );
    let _enter = span.enter();

    let Ok(method) = Method::from_bytes(req.method.as_bytes()) else {
        return not_found(&req.method, &req.path);
    };
    let Some(route_match) = router.route(&method, &req.path) else {
        warn!("No route matched");
        return not_found(&req.method, &req.path);
    };
    let route = Arc::clone(&route_match.route);

    let handler_req = match build_request(&route_match, req, method, request_id) {
        Ok(r) => r,
        Err(resp) => {
            info!(
                operation_id = %route.operation_id,
                status = resp.status,
                details = %resp.body,
                "Request rejected"
            );
            return resp;
        }
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| route.handler.handle(handler_req)));
    let resp = match outcome {
        Ok(Ok(resp)) => resp,
        Ok(Err(err)) => {
            error!(operation_id = %route.operation_id, error = %format!("{err:#}"), "Handler failed");
            return HandlerResponse::error(500, "Internal Server Error");
        }
        Err(_) => {
            error!(operation_id = %route.operation_id, "Handler panicked");
            return HandlerResponse::error(500, "Internal Server Error");
        }
    };

    if let Some(validator) = route.validators.response_for(resp.status) {
        let details = validator.errors(&resp.body);
        if !details.is_empty() {
            error!(
                operation_id = %route.operation_id,
                status = resp.status,
                details = ?details,
                "Response does not match the declared schema"
            );
            return HandlerResponse::json(
                500,
                json!({
                    "error": "Response validation failed",
                    "location": "response",
                    "details": details,
                }),
            );
        }
    }

    info!(operation_id = %route.operation_id, status = resp.status, "Request handled");
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::OperationBinder;
    use crate::registry::{HandlerRegistry, Reply};
    use crate::spec::{parse_description, Format};

    const DOC: &str = r#"
openapi: 3.0.0
info: { title: T, version: "1" }
paths:
  /items/{id}:
    get:
      operationId: getItem
      parameters:
        - { name: id, in: path, required: true, schema: { type: integer } }
        - { name: verbose, in: query, schema: { type: boolean } }
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: object
                required: [id]
                properties: { id: { type: integer } }
  /items:
    post:
      operationId: addItem
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              required: [name]
              properties: { name: { type: string } }
      responses: { "201": { description: created } }
  /boom:
    get:
      operationId: boom
      responses: { "200": { description: ok } }
"#;

    fn router() -> Router {
        let description = parse_description(DOC, Format::Yaml).unwrap();
        let registry = HandlerRegistry::builder()
            .register("getItem", |req: HandlerRequest| {
                let id: i64 = req.param("id")?;
                if id == 0 {
                    return Reply::new().send(json!({ "wrong": true }));
                }
                Reply::new().send(json!({ "id": id, "verbose": req.query.get("verbose") }))
            })
            .register("addItem", |req: HandlerRequest| {
                let name: String = req.body_field("name")?;
                Reply::new().code(201).send(json!({ "name": name }))
            })
            .register("boom", |_req: HandlerRequest| -> anyhow::Result<HandlerResponse> {
                panic!("boom")
            })
            .build()
            .unwrap();
        let mut router = Router::new();
        OperationBinder::new(&description, &registry)
            .bind(&mut router)
            .unwrap();
        router
    }

    fn request(method: &str, raw_path: &str, body: &str) -> ParsedRequest {
        let (path, query) = crate::server::split_path_and_query(raw_path);
        ParsedRequest {
            method: method.to_string(),
            path,
            headers: vec![],
            query,
            body: RequestBody::from_text(body),
        }
    }

    #[test]
    fn test_params_are_coerced() {
        let resp = dispatch(&router(), request("GET", "/items/5?verbose=true", ""));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!({ "id": 5, "verbose": true }));
    }

    #[test]
    fn test_invalid_param_is_bad_request() {
        let resp = dispatch(&router(), request("GET", "/items/abc", ""));
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["location"], "params");
    }

    #[test]
    fn test_unknown_route_is_not_found() {
        assert_eq!(dispatch(&router(), request("GET", "/nope", "")).status, 404);
        assert_eq!(dispatch(&router(), request("DELETE", "/items/1", "")).status, 404);
    }

    #[test]
    fn test_body_checks() {
        let r = router();
        assert_eq!(dispatch(&r, request("POST", "/items", r#"{"name":"a"}"#)).status, 201);

        let missing = dispatch(&r, request("POST", "/items", ""));
        assert_eq!(missing.status, 400);
        assert_eq!(missing.body["error"], "Request body required");

        let invalid = dispatch(&r, request("POST", "/items", r#"{"name":1}"#));
        assert_eq!(invalid.status, 400);
        assert_eq!(invalid.body["location"], "body");

        let garbage = dispatch(&r, request("POST", "/items", "{nope"));
        assert_eq!(garbage.body["error"], "Invalid JSON body");
    }

    #[test]
    fn test_handler_panic_is_internal_error() {
        let resp = dispatch(&router(), request("GET", "/boom", ""));
        assert_eq!(resp.status, 500);
    }

    #[test]
    fn test_response_validated() {
        let resp = dispatch(&router(), request("GET", "/items/0", ""));
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body["error"], "Response validation failed");
    }
}
