//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the bearer token and build the shared upstream client
//! - Resolve every configured service into an immutable route table
//! - Build the static handler and the listener TLS config
//!
//! # Design Decisions
//! - Fail fast: certificate and token errors are fatal
//! - Resolution failures are fatal only in strict mode; otherwise the
//!   configured host is used as-is and never retried
//! - Services resolve sequentially, on a blocking thread
//! - Nothing here touches the listener; traffic starts only once this returns

use url::Url;

use crate::config::{ConfigError, ProxyConfig, ServiceConfig};
use crate::discovery::{HostLookup, ResolutionError, Resolver, ServiceEnv};
use crate::http::dispatch::{Dispatcher, StaticMount};
use crate::http::static_files::static_service;
use crate::net::tls::load_tls_config;
use crate::net::{build_client, load_bearer_token, BridgeTracker, CertificateError};
use crate::routing::{BearerToken, RouteTable, ServiceRoute};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error("startup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything the server needs, built from configuration.
pub struct Prepared {
    pub dispatcher: Dispatcher,
    pub tls: Option<axum_server::tls_rustls::RustlsConfig>,
    pub bridges: BridgeTracker,
}

/// Per-route options shared by every service.
#[derive(Debug, Clone)]
pub struct RouteOptions {
    pub token: Option<BearerToken>,
    pub cors: bool,
    pub strict: bool,
}

pub async fn prepare<L, E>(config: &ProxyConfig, resolver: Resolver<L, E>) -> Result<Prepared, StartupError>
where
    L: HostLookup + 'static,
    E: ServiceEnv + 'static,
{
    let token = match &config.upstream.bearer_token_file {
        Some(path) => {
            let token = load_bearer_token(path)?;
            tracing::info!(path = %path.display(), "Loaded bearer token");
            Some(token)
        }
        None => None,
    };

    let client = build_client(&config.upstream)?;

    let options = RouteOptions {
        token,
        cors: config.upstream.cors,
        strict: config.upstream.fail_on_unknown_services,
    };
    let services = config.services.clone();
    let routes =
        tokio::task::spawn_blocking(move || build_routes(&services, &resolver, &options)).await??;

    let bridges = BridgeTracker::new();
    let static_mount = config.static_files.enabled.then(|| {
        tracing::info!(
            root = %config.static_files.root.display(),
            prefix = %config.static_files.prefix,
            default_page = ?config.static_files.default_page,
            "Serving static files"
        );
        StaticMount {
            prefix: config.static_files.prefix.clone(),
            service: static_service(&config.static_files),
        }
    });
    let dispatcher = Dispatcher::new(RouteTable::new(routes), client, bridges.clone(), static_mount);

    let tls = match &config.listener.tls {
        Some(tls) => Some(load_tls_config(&tls.cert_path, &tls.key_path).await?),
        None => None,
    };

    Ok(Prepared {
        dispatcher,
        tls,
        bridges,
    })
}

/// Resolve each service in order and build its route.
pub fn build_routes<L: HostLookup, E: ServiceEnv>(
    services: &[ServiceConfig],
    resolver: &Resolver<L, E>,
    options: &RouteOptions,
) -> Result<Vec<ServiceRoute>, StartupError> {
    let mut routes = Vec::with_capacity(services.len());
    for service in services {
        let upstream = Url::parse(&service.url).map_err(|e| ConfigError::InvalidService {
            spec: format!("{}={}", service.prefix, service.url),
            reason: e.to_string(),
        })?;
        let configured = configured_authority(&upstream);

        let resolved_host = match resolver.resolve(&configured) {
            Ok(resolution) => {
                let authority = resolution.authority();
                tracing::info!(
                    prefix = %service.prefix,
                    upstream = %upstream,
                    resolved = %authority,
                    source = %resolution.source,
                    "Creating service proxy"
                );
                authority
            }
            Err(e) if options.strict => return Err(e.into()),
            Err(e) => {
                tracing::warn!(
                    prefix = %service.prefix,
                    upstream = %upstream,
                    error = %e,
                    "Unknown service host, using configured address"
                );
                configured
            }
        };

        routes.push(ServiceRoute {
            prefix: service.prefix.clone(),
            upstream,
            resolved_host,
            auth_token: options.token.clone(),
            cors_enabled: options.cors,
        });
    }
    Ok(routes)
}

/// `host[:port]` exactly as configured in `url`.
fn configured_authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
