//! HTTP server setup.
//!
//! # Responsibilities
//! - Run startup and wrap the dispatcher in an Axum router
//! - Wire up middleware (request ID, tracing / access log)
//! - Serve plaintext or TLS on the given listener
//! - Stop accepting on the shutdown signal and drain in-flight requests

use std::{io, net::SocketAddr, time::Duration};

use axum::{body::Body, extract::State, http::Request, response::Response, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ProxyConfig;
use crate::discovery::{HostLookup, Resolver, ServiceEnv};
use crate::http::dispatch::Dispatcher;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::startup::{self, StartupError};
use crate::net::BridgeTracker;

/// How long TLS connections may drain after shutdown is signalled.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The gateway: static files, service proxies and WebSocket bridges on one port.
pub struct HttpServer {
    router: Router,
    tls: Option<RustlsConfig>,
    bridges: BridgeTracker,
}

impl HttpServer {
    /// Build the server with system DNS and the process environment.
    pub async fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        Self::with_resolver(config, Resolver::system()).await
    }

    pub async fn with_resolver<L, E>(config: ProxyConfig, resolver: Resolver<L, E>) -> Result<Self, StartupError>
    where
        L: HostLookup + 'static,
        E: ServiceEnv + 'static,
    {
        let prepared = startup::prepare(&config, resolver).await?;
        tracing::info!(
            services = prepared.dispatcher.table().routes().len(),
            static_files = config.static_files.enabled,
            tls = prepared.tls.is_some(),
            "Gateway ready"
        );
        let router = Self::build_router(&config, prepared.dispatcher);
        Ok(Self {
            router,
            tls: prepared.tls,
            bridges: prepared.bridges,
        })
    }

    fn build_router(config: &ProxyConfig, dispatcher: Dispatcher) -> Router {
        let router = Router::new().fallback(dispatch_handler).with_state(dispatcher);

        let router = if config.observability.access_logging {
            router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
        } else {
            router.layer(TraceLayer::new_for_http())
        };

        router
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// Live WebSocket bridges.
    pub fn bridges(&self) -> BridgeTracker {
        self.bridges.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        match self.tls {
            Some(tls) => {
                tracing::info!(address = %addr, "HTTPS server starting");
                let handle = axum_server::Handle::new();
                let on_shutdown = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    on_shutdown.graceful_shutdown(Some(DRAIN_TIMEOUT));
                });
                axum_server::from_tcp_rustls(listener.into_std()?, tls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await?;
            }
        }

        tracing::info!(active_bridges = self.bridges.active_count(), "HTTP server stopped");
        Ok(())
    }
}

async fn dispatch_handler(State(dispatcher): State<Dispatcher>, req: Request<Body>) -> Response {
    dispatcher.dispatch(req).await
}
