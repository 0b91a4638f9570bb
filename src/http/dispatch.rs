//! Request dispatch.
//!
//! # Responsibilities
//! - Match the request path against the route table
//! - Send upgrade requests to the WebSocket bridge, others to the HTTP chain
//! - Hand unmatched paths under the static prefix to the static handler
//! - Answer everything else with 404
//!
//! # Design Decisions
//! - Service routes always win over the static mount
//! - Handlers are built once at startup and cloned per request

use std::{collections::HashMap, sync::Arc, time::Instant};

use axum::{body::Body, http::Request, response::Response};
use tower::ServiceExt;

use crate::http::proxy::{proxy_service, ProxyService};
use crate::http::response::not_found;
use crate::http::static_files::StaticService;
use crate::http::websocket::WebSocketBridge;
use crate::net::{BridgeTracker, UpstreamClient};
use crate::observability::metrics::{self, RequestKind};
use crate::routing::{classify, Protocol, RouteTable, ServiceRoute};

/// Handlers for one service route.
#[derive(Clone)]
struct ServiceHandler {
    http: ProxyService,
    websocket: WebSocketBridge,
}

impl ServiceHandler {
    fn new(route: Arc<ServiceRoute>, client: &UpstreamClient, bridges: &BridgeTracker) -> Self {
        Self {
            http: proxy_service(route.clone(), client.clone()),
            websocket: WebSocketBridge::new(route, client.clone(), bridges.clone()),
        }
    }
}

/// The static handler and the prefix it is mounted on.
#[derive(Clone)]
pub struct StaticMount {
    pub prefix: String,
    pub service: StaticService,
}

#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
    handlers: Arc<HashMap<String, ServiceHandler>>,
    static_mount: Option<StaticMount>,
}

impl Dispatcher {
    pub fn new(
        table: RouteTable,
        client: UpstreamClient,
        bridges: BridgeTracker,
        static_mount: Option<StaticMount>,
    ) -> Self {
        let handlers = table
            .routes()
            .iter()
            .map(|route| {
                (
                    route.prefix.clone(),
                    ServiceHandler::new(route.clone(), &client, &bridges),
                )
            })
            .collect();
        Self {
            table: Arc::new(table),
            handlers: Arc::new(handlers),
            static_mount,
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub async fn dispatch(&self, req: Request<Body>) -> Response {
        let start = Instant::now();
        let (kind, response) = self.route(req).await;
        metrics::record_request(kind, response.status().as_u16(), start);
        response
    }

    async fn route(&self, req: Request<Body>) -> (RequestKind, Response) {
        let handler = self
            .table
            .match_path(req.uri().path())
            .and_then(|route| self.handlers.get(&route.prefix));

        if let Some(handler) = handler {
            return match classify(&req) {
                Protocol::WebSocket => (RequestKind::WebSocket, handler.websocket.handle(req).await),
                Protocol::Http => {
                    let response = handler.http.clone().oneshot(req).await;
                    (RequestKind::Proxy, response.unwrap_or_else(|never| match never {}))
                }
            };
        }

        match &self.static_mount {
            Some(mount) if req.uri().path().starts_with(mount.prefix.as_str()) => {
                let response = mount.service.clone().oneshot(req).await;
                (RequestKind::Static, response.unwrap_or_else(|never| match never {}))
            }
            _ => {
                tracing::debug!(path = %req.uri().path(), "No route matched");
                (RequestKind::Unrouted, not_found())
            }
        }
    }
}
