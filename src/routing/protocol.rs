//! Request protocol classification.
//!
//! A request is bridged as a WebSocket when any of these hold:
//! - the request URI scheme is `ws` or `wss`;
//! - the first `watch` query parameter is exactly `true`;
//! - the first `Connection` header equals `upgrade` and the first `Upgrade`
//!   header equals `websocket`, both ASCII case-insensitively.
//!
//! The `watch=true` rule is a narrow compatibility rule for streaming watch
//! clients, not a general WebSocket detection signal. Absent headers never match.

use axum::http::{header, HeaderMap, HeaderName, Request, Uri};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    WebSocket,
}

pub fn classify<B>(req: &Request<B>) -> Protocol {
    if is_upgrade_request(req) {
        Protocol::WebSocket
    } else {
        Protocol::Http
    }
}

pub fn is_upgrade_request<B>(req: &Request<B>) -> bool {
    has_websocket_scheme(req.uri()) || is_watch(req.uri()) || has_upgrade_headers(req.headers())
}

fn has_websocket_scheme(uri: &Uri) -> bool {
    matches!(uri.scheme_str(), Some("ws") | Some("wss"))
}

fn is_watch(uri: &Uri) -> bool {
    uri.query()
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == "watch")
                .map(|(_, v)| v == "true")
        })
        .unwrap_or(false)
}

fn has_upgrade_headers(headers: &HeaderMap) -> bool {
    first_value_is(headers, &header::CONNECTION, "upgrade")
        && first_value_is(headers, &header::UPGRADE, "websocket")
}

fn first_value_is(headers: &HeaderMap, name: &HeaderName, expected: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}
