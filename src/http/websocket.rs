//! WebSocket bridging.
//!
//! # Responsibilities
//! - Build the upstream handshake URI (secure scheme, resolved host, stripped path)
//! - Inject the bearer token as `access_token` when the client sent none
//! - Complete the handshake upstream first, then upgrade the client
//! - Copy bytes both ways until either side closes
//!
//! # Data Flow
//! ```text
//! Client ──upgrade──→ Proxy ──upgrade (TLS)──→ Upstream
//!        ←── 101 ────       ←──── 101 ───────
//! Client ←══════ raw bytes, both directions ══════→ Upstream
//! ```
//!
//! # Design Decisions
//! - Bytes are copied, not frames: control frames pass through untouched
//! - A non-101 upstream answer is returned to the client as-is (watch streams)
//! - When one direction ends both connections are shut down
//! - Each bridge holds a `BridgeGuard` for its whole lifetime

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderValue, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
};
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use tokio::io::AsyncWriteExt;
use url::form_urlencoded;

use crate::http::headers::{append_forwarded_for, strip_hop_by_hop};
use crate::http::proxy::ProxyError;
use crate::http::request::request_id;
use crate::net::{BridgeGuard, BridgeTracker, UpstreamClient};
use crate::routing::{BearerToken, ServiceRoute};

/// How long a closing bridge waits for each side to acknowledge shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const ACCESS_TOKEN: &str = "access_token";

/// Bridges upgrade requests for a single route.
#[derive(Clone)]
pub struct WebSocketBridge {
    route: Arc<ServiceRoute>,
    client: UpstreamClient,
    tracker: BridgeTracker,
}

impl WebSocketBridge {
    pub fn new(route: Arc<ServiceRoute>, client: UpstreamClient, tracker: BridgeTracker) -> Self {
        Self { route, client, tracker }
    }

    pub async fn handle(&self, req: Request<Body>) -> Response {
        let id = request_id(&req).to_string();
        match self.try_handle(req).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    request_id = %id,
                    prefix = %self.route.prefix,
                    upstream = %self.route.resolved_host,
                    error = %e,
                    "WebSocket handshake failed"
                );
                e.into_response()
            }
        }
    }

    async fn try_handle(&self, mut req: Request<Body>) -> Result<Response, ProxyError> {
        let uri = websocket_uri(&self.route, req.uri(), self.route.auth_token.as_ref())?;
        tracing::info!(
            prefix = %self.route.prefix,
            url = %format_args!("wss://{}{}", self.route.resolved_host, uri.path()),
            "Creating websocket proxy"
        );

        let client_upgrade = hyper::upgrade::on(&mut req);
        let (parts, _body) = req.into_parts();

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(uri)
            .version(Version::HTTP_11)
            .body(Body::empty())?;

        let upgrade = parts.headers.get(header::UPGRADE).cloned();
        let headers = outbound.headers_mut();
        *headers = parts.headers;
        strip_hop_by_hop(headers);
        headers.remove(header::HOST);
        if let Some(upgrade) = upgrade {
            headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
            headers.insert(header::UPGRADE, upgrade);
        }
        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            append_forwarded_for(headers, addr.ip());
        }

        let mut upstream = self.client.request(outbound).await?;

        if upstream.status() != StatusCode::SWITCHING_PROTOCOLS {
            tracing::debug!(status = %upstream.status(), "Upstream declined upgrade");
            let (mut parts, body) = upstream.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            return Ok(Response::from_parts(parts, Body::new(body)));
        }

        let upstream_upgrade = hyper::upgrade::on(&mut upstream);
        let mut response = Response::builder()
            .status(StatusCode::SWITCHING_PROTOCOLS)
            .body(Body::empty())?;
        *response.headers_mut() = upstream.headers().clone();

        let guard = self.tracker.track();
        tokio::spawn(async move {
            match futures_util::future::try_join(client_upgrade, upstream_upgrade).await {
                Ok((client, upstream)) => pipe(client, upstream, guard).await,
                Err(e) => {
                    let e = ProxyError::Upgrade(e);
                    tracing::warn!(session = %guard.id(), error = %e, "WebSocket upgrade failed");
                }
            }
        });

        Ok(response)
    }
}

/// Copy bytes between the two upgraded connections until either side ends,
/// then shut both down. The guard is released when this returns.
async fn pipe(client: Upgraded, upstream: Upgraded, guard: BridgeGuard) {
    let session = guard.id();
    tracing::debug!(session = %session, "WebSocket bridge open");

    let (mut client_read, mut client_write) = tokio::io::split(TokioIo::new(client));
    let (mut upstream_read, mut upstream_write) = tokio::io::split(TokioIo::new(upstream));

    let (closed_by, result) = tokio::select! {
        res = tokio::io::copy(&mut client_read, &mut upstream_write) => ("client", res),
        res = tokio::io::copy(&mut upstream_read, &mut client_write) => ("upstream", res),
    };

    match result {
        Ok(bytes) => tracing::debug!(session = %session, closed_by, bytes, "WebSocket bridge closing"),
        Err(e) => tracing::debug!(session = %session, closed_by, error = %e, "WebSocket bridge error"),
    }

    let _ = tokio::time::timeout(CLOSE_TIMEOUT, async {
        let _ = client_write.shutdown().await;
        let _ = upstream_write.shutdown().await;
    })
    .await;

    drop(guard);
}

/// Build the upstream handshake URI for `uri` on `route`.
///
/// Bridges always use the secure scheme; the hyper client speaks it as
/// `https`. The path is the stripped request path only.
pub fn websocket_uri(
    route: &ServiceRoute,
    uri: &Uri,
    token: Option<&BearerToken>,
) -> Result<Uri, ProxyError> {
    let stripped = route.strip_prefix(uri.path());
    let path = if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    };
    let query = uri.query();
    let query = match token {
        Some(token) => Some(with_access_token(query, token)),
        None => query.filter(|q| !q.is_empty()).map(str::to_string),
    };
    let path_and_query = match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path,
    };
    Ok(Uri::builder()
        .scheme("https")
        .authority(route.resolved_host.as_str())
        .path_and_query(path_and_query)
        .build()?)
}

/// Add `access_token=<token>` unless the first `access_token` value is non-empty.
fn with_access_token(query: Option<&str>, token: &BearerToken) -> String {
    let query = query.unwrap_or("");
    let present = form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == ACCESS_TOKEN)
        .map(|(_, v)| !v.is_empty())
        .unwrap_or(false);
    if present {
        return query.to_string();
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        if k != ACCESS_TOKEN {
            serializer.append_pair(&k, &v);
        }
    }
    serializer.append_pair(ACCESS_TOKEN, token.as_str());
    serializer.finish()
}
