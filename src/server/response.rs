use crate::registry::HandlerResponse;
use may_minihttp::Response;

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => match status / 100 {
            1 => "Informational",
            2 => "Success",
            3 => "Redirection",
            4 => "Client Error",
            _ => "Server Error",
        },
    }
}

/// Whether a status forbids a message body.
pub(crate) fn is_bodiless(status: u16) -> bool {
    status == 204 || status == 304 || (100..200).contains(&status)
}

/// Write a handler response as JSON.
pub fn write_json(res: &mut Response, resp: HandlerResponse) {
    res.status_code(usize::from(resp.status), status_reason(resp.status));
    if is_bodiless(resp.status) {
        return;
    }
    res.header("Content-Type: application/json");
    res.body_vec(resp.body.to_string().into_bytes());
}
