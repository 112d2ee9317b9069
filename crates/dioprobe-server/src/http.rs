//! Minimal HTTP/1.1 handling for the metrics and health endpoints.
//!
//! Only `GET` request heads are understood. Bodies are never read and
//! connections are never kept alive.

use prometheus::{Encoder, Registry, TEXT_FORMAT, TextEncoder};
use tracing::{debug, error};

/// Upper bound on a request head. Larger requests get `400`.
pub const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Outcome of parsing the bytes received so far.
#[derive(Debug, PartialEq, Eq)]
pub enum Parsed<'a> {
    /// The head is not terminated yet.
    Incomplete,
    /// A complete `GET` head for this path (query string stripped).
    Get(&'a str),
    /// A complete head that is not a `GET` or is malformed.
    Invalid,
}

/// Parses a request head from the start of `buf`.
pub fn parse_request(buf: &[u8]) -> Parsed<'_> {
    let Some(head_end) = find_head_end(buf) else {
        return Parsed::Incomplete;
    };
    let Ok(head) = std::str::from_utf8(&buf[..head_end]) else {
        return Parsed::Invalid;
    };
    match parse_request_path(head) {
        Some(path) => Parsed::Get(path.split('?').next().unwrap_or(path)),
        None => Parsed::Invalid,
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .or_else(|| buf.windows(2).position(|w| w == b"\n\n"))
}

/// Parse the request path from an HTTP request line.
fn parse_request_path(request: &str) -> Option<&str> {
    let first_line = request.lines().next()?;
    let mut parts = first_line.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;

    if method != "GET" {
        return None;
    }

    Some(path)
}

/// Route that renders the registry.
pub const METRICS_PATH: &str = "/metrics";

/// Route that answers without touching the probe target.
pub const HEALTH_PATH: &str = "/healthz";

/// Answers every route except [`METRICS_PATH`], which is rendered by the
/// scrape worker through [`metrics_response`].
pub fn dispatch(path: &str) -> String {
    debug!(path, "dispatch");
    match path {
        HEALTH_PATH => http_response(200, "text/plain", "ok"),
        _ => http_response(404, "text/plain", "Not Found"),
    }
}

/// Renders `registry` as a complete `/metrics` response.
pub fn metrics_response(registry: &Registry) -> String {
    match render_metrics(registry) {
        Ok(body) => http_response(200, TEXT_FORMAT, &body),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            http_response(500, "text/plain", "Internal Server Error")
        }
    }
}

/// Gathers every registered collector and encodes the text exposition.
///
/// Gathering runs the probe collectors synchronously.
pub fn render_metrics(registry: &Registry) -> prometheus::Result<String> {
    let families = registry.gather();
    let mut buf = Vec::new();
    TextEncoder::new().encode(&families, &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Build a minimal HTTP/1.1 response.
pub fn http_response(status: u16, content_type: &str, body: &str) -> String {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };

    format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    )
}

/// Response for heads that are not a `GET` or exceed [`MAX_REQUEST_HEAD`].
pub fn bad_request() -> String {
    http_response(400, "text/plain", "Bad Request")
}
