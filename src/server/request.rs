use may_minihttp::Request;
use serde_json::Value;
use std::io::Read;
use tracing::debug;

/// Request body as received.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Non-empty body that is not JSON; holds the parse error
    Invalid(String),
}

impl RequestBody {
    /// Classify raw body text.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        if text.trim().is_empty() {
            return RequestBody::Empty;
        }
        match serde_json::from_str(text) {
            Ok(v) => RequestBody::Json(v),
            Err(e) => RequestBody::Invalid(e.to_string()),
        }
    }
}

/// Transport-independent view of an HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    /// Path without the query string
    pub path: String,
    /// Header `(name, value)` pairs, names lower-cased
    pub headers: Vec<(String, String)>,
    /// Decoded query pairs in order; names may repeat
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ParsedRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Split `/pets?limit=2` into its path and decoded query pairs.
#[must_use]
pub fn split_path_and_query(raw: &str) -> (String, Vec<(String, String)>) {
    match raw.split_once('?') {
        Some((path, query)) => (
            path.to_string(),
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        ),
        None => (raw.to_string(), Vec::new()),
    }
}

/// Extract everything dispatch needs from a `may_minihttp::Request`.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let (path, query) = split_path_and_query(req.path());

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let mut text = String::new();
    let body = match req.body().read_to_string(&mut text) {
        Ok(_) => RequestBody::from_text(&text),
        Err(e) => RequestBody::Invalid(e.to_string()),
    };

    debug!(
        method = %method,
        path = %path,
        header_count = headers.len(),
        query_count = query.len(),
        body_bytes = text.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        query,
        body,
    }
}
