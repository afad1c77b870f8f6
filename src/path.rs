//! Translation of description-style path templates (`/pets/{petId}`) into
//! the router's colon syntax (`/pets/:petId`).
//!
//! Placeholder names are limited to word characters and hyphens, and must be
//! non-empty. A brace group holding anything else (e.g. `{pet.id}`) is left
//! untouched and will be matched literally by the router. So is an empty
//! `{}`: it is not rewritten to a bare `:`, which would name no parameter.
//!
//! Text outside placeholders is copied as is, colons included. The router
//! tells a literal colon (`/users/{id}:activate`) from a parameter by the
//! operation's declared path parameters.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

#[allow(clippy::expect_used)]
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([\w-]+)\}").expect("placeholder regex must compile"));

/// Rewrite every `{name}` placeholder as `:name`.
///
/// Borrows the input when it contains no placeholder.
///
/// ```rust
/// use oasbind::path::to_router_path;
///
/// assert_eq!(to_router_path("/users/{user-id}/posts/{postId}"), "/users/:user-id/posts/:postId");
/// assert_eq!(to_router_path("/pets"), "/pets");
/// ```
#[must_use]
pub fn to_router_path(template: &str) -> Cow<'_, str> {
    PLACEHOLDER.replace_all(template, ":${1}")
}

/// Names of the placeholders in a description-style template, in order.
#[must_use]
pub fn placeholder_names(template: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}
