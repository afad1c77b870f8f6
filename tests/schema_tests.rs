use oasbind::schema::{derive_schema, ContentKind, DeriveError, MediaTypePolicy};
use oasbind::spec::{parse_description, Format, Operation};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn operation(value: Value) -> Operation {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_one_parameter_per_location() {
    let op = operation(json!({
        "operationId": "getThing",
        "parameters": [
            { "name": "thingId", "in": "path", "required": true, "schema": { "type": "string" } },
            { "name": "expand", "in": "query", "schema": { "type": "boolean" } },
            { "name": "X-Tenant", "in": "header", "required": true, "schema": { "type": "string" } }
        ]
    }));
    let schema = derive_schema(&op, MediaTypePolicy::Single).unwrap().to_value();

    assert_eq!(
        schema,
        json!({
            "params": {
                "type": "object",
                "properties": { "thingId": { "type": "string" } },
                "required": ["thingId"]
            },
            "querystring": {
                "type": "object",
                "properties": { "expand": { "type": "boolean" } },
                "required": []
            },
            "headers": {
                "type": "object",
                "properties": { "X-Tenant": { "type": "string" } },
                "required": ["X-Tenant"]
            }
        })
    );
}

#[test]
fn test_cookie_parameters_ignored() {
    let op = operation(json!({
        "operationId": "withCookie",
        "parameters": [{ "name": "session", "in": "cookie", "schema": { "type": "string" } }]
    }));
    let schema = derive_schema(&op, MediaTypePolicy::Single).unwrap();
    assert!(schema.params.is_empty());
    assert!(schema.querystring.is_empty());
    assert!(schema.headers.is_empty());
}

#[test]
fn test_empty_responses_map_yields_no_response_key() {
    let op = operation(json!({ "operationId": "noop", "responses": {} }));
    let schema = derive_schema(&op, MediaTypePolicy::Single).unwrap().to_value();
    assert!(schema.get("response").is_none());
    assert!(schema.get("body").is_none());
}

#[test]
fn test_response_order_follows_document() {
    let op = operation(json!({
        "operationId": "many",
        "responses": {
            "default": { "description": "err", "content": { "application/json": { "schema": { "type": "object" } } } },
            "404": { "description": "missing", "content": { "application/json": { "schema": { "type": "string" } } } },
            "200": { "description": "ok", "content": { "application/json": { "schema": { "type": "array" } } } }
        }
    }));
    let schema = derive_schema(&op, MediaTypePolicy::Single).unwrap();
    let statuses: Vec<&str> = schema
        .response
        .as_ref()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(statuses, vec!["default", "404", "200"]);
}

#[test]
fn test_media_type_without_schema_contributes_nothing() {
    let op = operation(json!({
        "operationId": "upload",
        "requestBody": { "content": { "application/octet-stream": {} } },
        "responses": { "200": { "description": "ok", "content": { "text/plain": {} } } }
    }));
    let schema = derive_schema(&op, MediaTypePolicy::Single).unwrap();
    assert_eq!(schema.body, None);
    assert_eq!(schema.response, None);
}

#[test]
fn test_ambiguous_parameter_content_names_the_parameter() {
    let op = operation(json!({
        "operationId": "filter",
        "parameters": [{
            "name": "q",
            "in": "query",
            "content": {
                "application/json": { "schema": { "type": "object" } },
                "text/plain": { "schema": { "type": "string" } }
            }
        }]
    }));
    let err = derive_schema(&op, MediaTypePolicy::Single).unwrap_err();
    assert_eq!(
        err,
        DeriveError::AmbiguousContent {
            operation: "filter".to_string(),
            kind: ContentKind::Param("q".to_string()),
            media_types: vec!["application/json".to_string(), "text/plain".to_string()],
        }
    );
    assert_eq!(
        err.to_string(),
        "operation `filter`: param `q` declares 2 media types (application/json, text/plain); exactly one is supported"
    );
}

#[test]
fn test_refs_are_resolved_before_derivation() {
    let description = parse_description(
        r##"
openapi: 3.0.0
info: { title: T, version: "1" }
paths:
  /pets/{petId}:
    parameters:
      - $ref: "#/components/parameters/PetId"
    get:
      operationId: showPetById
      responses:
        "200":
          $ref: "#/components/responses/PetResponse"
components:
  parameters:
    PetId: { name: petId, in: path, required: true, schema: { type: integer } }
  responses:
    PetResponse:
      description: a pet
      content:
        application/json:
          schema: { $ref: "#/components/schemas/Pet" }
  schemas:
    Pet:
      type: object
      properties:
        id: { type: integer }
"##,
        Format::Yaml,
    )
    .unwrap();

    let item = &description.paths.as_ref().unwrap()["/pets/{petId}"];
    let op = item.operations[0].1.with_path_parameters(&item.parameters);
    let schema = derive_schema(&op, MediaTypePolicy::Single).unwrap();

    assert_eq!(schema.params.properties()["petId"], json!({ "type": "integer" }));
    assert_eq!(
        schema.response.unwrap()["200"],
        json!({ "type": "object", "properties": { "id": { "type": "integer" } } })
    );
}
