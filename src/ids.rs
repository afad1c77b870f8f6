//! Request identifiers.
//!
//! Every dispatched request carries a [`RequestId`]: the caller's
//! `x-request-id` when it is a valid ULID, a fresh ULID otherwise. It is
//! recorded on the request span and handed to the handler.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::debug;

/// Header carrying a caller-supplied request id (lower-cased, as stored in
/// [`ParsedRequest::headers`](crate::server::ParsedRequest::headers)).
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// ULID request identifier.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Take the id from [`REQUEST_ID_HEADER`] among `headers`, or mint one.
    ///
    /// A present but malformed value is logged at `debug` and replaced.
    #[must_use]
    pub fn from_headers(headers: &[(String, String)]) -> Self {
        let Some((_, raw)) = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(REQUEST_ID_HEADER))
        else {
            return Self::new();
        };
        match raw.trim().parse() {
            Ok(id) => id,
            Err(err) => {
                debug!(value = %raw, error = %err, "Ignoring malformed x-request-id");
                Self::new()
            }
        }
    }

    /// Milliseconds since the Unix epoch encoded in the id.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RequestId(ulid::Ulid::from_string(s)?))
    }
}
