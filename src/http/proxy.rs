//! HTTP reverse proxy for one service route.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the route's upstream
//! - Forward method, headers and body through the shared client
//! - Stream the upstream response back unchanged
//!
//! # Data Flow
//! ```text
//! Request → [CORS header] → [Authorization overwrite] → forward → Upstream
//! ```
//!
//! # Design Decisions
//! - Header decorators are tower layers composed once per route at startup
//! - The route prefix is stripped exactly once
//! - Upstream failures become 502 for that request only

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{
        header::{ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, HOST},
        HeaderValue, Request, Uri, Version,
    },
    response::{IntoResponse, Response},
};
use tower::{service_fn, util::BoxCloneSyncService, Layer};
use tower_http::set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer};

use crate::http::headers::{append_forwarded_for, strip_hop_by_hop};
use crate::http::request::request_id;
use crate::http::response::bad_gateway;
use crate::net::UpstreamClient;
use crate::routing::ServiceRoute;

/// A boxed per-route handler chain.
pub type ProxyService = BoxCloneSyncService<Request<Body>, Response, Infallible>;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid upstream uri: {0}")]
    InvalidUpstreamUri(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("protocol upgrade failed: {0}")]
    Upgrade(#[source] hyper::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        bad_gateway()
    }
}

/// Forwards requests for a single route.
#[derive(Clone)]
pub struct ReverseProxy {
    route: Arc<ServiceRoute>,
    client: UpstreamClient,
}

impl ReverseProxy {
    pub fn new(route: Arc<ServiceRoute>, client: UpstreamClient) -> Self {
        Self { route, client }
    }

    /// Forward `req` upstream, answering 502 on any failure.
    pub async fn forward(&self, req: Request<Body>) -> Response {
        let id = request_id(&req).to_string();
        match self.try_forward(req).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    request_id = %id,
                    prefix = %self.route.prefix,
                    upstream = %self.route.resolved_host,
                    error = %e,
                    "Upstream request failed"
                );
                e.into_response()
            }
        }
    }

    async fn try_forward(&self, req: Request<Body>) -> Result<Response, ProxyError> {
        let (parts, body) = req.into_parts();
        let uri = forward_uri(&self.route, &parts.uri)?;

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(uri)
            .version(Version::HTTP_11)
            .body(body)?;

        let headers = outbound.headers_mut();
        *headers = parts.headers;
        strip_hop_by_hop(headers);
        headers.remove(HOST);
        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            append_forwarded_for(headers, addr.ip());
        }

        let response = self.client.request(outbound).await?;
        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Build the upstream URI for `uri` on `route`.
///
/// The prefix is stripped once, the remainder joined onto the upstream path
/// with a single slash, and the two query strings merged.
pub fn forward_uri(route: &ServiceRoute, uri: &Uri) -> Result<Uri, ProxyError> {
    let path = join_paths(route.upstream.path(), route.strip_prefix(uri.path()));
    let path_and_query = match merge_queries(route.upstream.query(), uri.query()) {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };
    Ok(Uri::builder()
        .scheme(route.upstream.scheme())
        .authority(route.resolved_host.as_str())
        .path_and_query(path_and_query)
        .build()?)
}

fn join_paths(base: &str, rest: &str) -> String {
    let joined = match (base.ends_with('/'), rest.starts_with('/')) {
        (true, true) => format!("{base}{}", &rest[1..]),
        (false, false) => format!("{base}/{rest}"),
        _ => format!("{base}{rest}"),
    };
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

fn merge_queries(upstream: Option<&str>, request: Option<&str>) -> Option<String> {
    match (upstream.filter(|q| !q.is_empty()), request.filter(|q| !q.is_empty())) {
        (Some(a), Some(b)) => Some(format!("{a}&{b}")),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    }
}

/// Compose the HTTP chain for `route`: CORS (outermost), then the
/// Authorization overwrite, then the forwarder.
pub fn proxy_service(route: Arc<ServiceRoute>, client: UpstreamClient) -> ProxyService {
    let proxy = ReverseProxy::new(route.clone(), client);
    let mut service: ProxyService = BoxCloneSyncService::new(service_fn(move |req| {
        let proxy = proxy.clone();
        async move { Ok::<_, Infallible>(proxy.forward(req).await) }
    }));

    if let Some(token) = &route.auth_token {
        service = BoxCloneSyncService::new(
            SetRequestHeaderLayer::overriding(AUTHORIZATION, token.header_value()).layer(service),
        );
    }
    if route.cors_enabled {
        service = BoxCloneSyncService::new(
            SetResponseHeaderLayer::overriding(
                ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            )
            .layer(service),
        );
    }
    service
}
