//! Response construction.
//!
//! # Responsibilities
//! - Copy upstream headers onto the client response
//! - Build the HTML, passthrough and plain-text error responses
//!
//! # Design Decisions
//! - Bodies are fully buffered, so framing headers are recomputed locally
//! - Hop-by-hop headers stripped automatically
//! - Repeated upstream headers keep every value, in order

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::request::X_REQUEST_ID;

/// Body returned when the `u` parameter is missing.
pub const MISSING_TARGET_BODY: &str = "query parameter not found";

/// Body returned for fetch failures and non-success upstream statuses.
pub const PROXY_ERROR_BODY: &str = "proxy error";

const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Append every end-to-end upstream header to `target`.
///
/// `content-length` is skipped as well: the local server derives it from
/// the buffered body. The upstream's `x-request-id` never replaces ours.
pub fn copy_upstream_headers(upstream: &HeaderMap, target: &mut HeaderMap) {
    for (name, value) in upstream {
        if is_hop_by_hop(name) || *name == header::CONTENT_LENGTH || *name == X_REQUEST_ID {
            continue;
        }
        target.append(name.clone(), value.clone());
    }
}

/// The upstream `content-type`, or `""` when absent or not visible ASCII.
pub fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// A `text/plain` response.
pub fn plain_text(status: StatusCode, body: &'static str) -> Response {
    (status, body).into_response()
}

/// A 200 HTML response carrying the upstream headers.
pub fn html_response(upstream: &HeaderMap, body: String) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    copy_upstream_headers(upstream, headers);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    response
}

/// A 200 response returning the upstream bytes and headers unchanged.
pub fn passthrough_response(upstream: &HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    copy_upstream_headers(upstream, response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
        headers
    }

    #[test]
    fn test_copy_skips_framing_headers() {
        let mut target = HeaderMap::new();
        copy_upstream_headers(&upstream_headers(), &mut target);

        assert!(target.get(header::CONTENT_LENGTH).is_none());
        assert!(target.get(header::TRANSFER_ENCODING).is_none());
        assert!(target.get(header::CONNECTION).is_none());
        assert_eq!(target.get(header::CACHE_CONTROL).unwrap(), "max-age=60");
    }

    #[test]
    fn test_copy_skips_upstream_request_id() {
        let mut upstream = upstream_headers();
        upstream.insert(X_REQUEST_ID, HeaderValue::from_static("upstream-id"));
        let mut target = HeaderMap::new();
        target.insert(X_REQUEST_ID, HeaderValue::from_static("local-id"));

        copy_upstream_headers(&upstream, &mut target);

        let ids: Vec<_> = target.get_all(X_REQUEST_ID).iter().collect();
        assert_eq!(ids, vec!["local-id"]);
    }

    #[test]
    fn test_copy_keeps_repeated_headers() {
        let mut target = HeaderMap::new();
        copy_upstream_headers(&upstream_headers(), &mut target);

        let cookies: Vec<_> = target.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_content_type_default() {
        assert_eq!(content_type(&HeaderMap::new()), "");
        assert_eq!(content_type(&upstream_headers()), "text/html");
    }

    #[test]
    fn test_html_response_overrides_content_type() {
        let response = html_response(&upstream_headers(), "<p></p>".into());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), HTML_CONTENT_TYPE);
        assert_eq!(response.headers().get_all(header::CONTENT_TYPE).iter().count(), 1);
    }

    #[test]
    fn test_passthrough_keeps_content_type() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
        let response = passthrough_response(&upstream, Bytes::from_static(b"\x89PNG"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    }

    #[test]
    fn test_plain_text() {
        let response = plain_text(StatusCode::BAD_REQUEST, MISSING_TARGET_BODY);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }
}
