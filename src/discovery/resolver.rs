//! Upstream host resolution with service-environment fallback.
//!
//! # Algorithm
//! 1. Split `host[:port]` on the last colon (bracketed IPv6 understood).
//! 2. IP literals are returned as-is; no lookup.
//! 3. A successful DNS lookup returns the input unchanged.
//! 4. A failed lookup of a dot-free name falls back to
//!    `<NAME>_SERVICE_HOST` / `<NAME>_SERVICE_PORT`, where `NAME` is the
//!    host upper-cased with `-` replaced by `_`. The environment port
//!    replaces the configured one.
//! 5. Anything else is `UnknownServiceHost`.

use std::fmt;
use std::io;
use std::net::IpAddr;

use thiserror::Error;

use crate::discovery::env::{HostLookup, ProcessEnv, ServiceEnv, SystemLookup};

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("unknown service host: {host}")]
    UnknownServiceHost {
        host: String,
        #[source]
        source: io::Error,
    },
}

impl ResolutionError {
    /// The host that failed to resolve, as configured.
    pub fn host(&self) -> &str {
        match self {
            ResolutionError::UnknownServiceHost { host, .. } => host,
        }
    }
}

/// How a host was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The host was an IP literal.
    Literal,
    /// DNS knows the host.
    Dns,
    /// Found through `<NAME>_SERVICE_HOST`.
    ServiceEnv,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSource::Literal => f.write_str("literal"),
            ResolutionSource::Dns => f.write_str("dns"),
            ResolutionSource::ServiceEnv => f.write_str("service-env"),
        }
    }
}

/// A successfully resolved upstream host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub host: String,
    pub port: Option<String>,
    pub source: ResolutionSource,
}

impl Resolution {
    /// `host[:port]`, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match &self.port {
            Some(port) => format!("{host}:{port}"),
            None => host,
        }
    }
}

/// Resolves configured upstream hosts. Holds no mutable state.
#[derive(Debug, Clone, Default)]
pub struct Resolver<L = SystemLookup, E = ProcessEnv> {
    lookup: L,
    env: E,
}

impl Resolver {
    /// Resolver backed by the system DNS and process environment.
    pub fn system() -> Self {
        Self::default()
    }
}

impl<L: HostLookup, E: ServiceEnv> Resolver<L, E> {
    pub fn new(lookup: L, env: E) -> Self {
        Self { lookup, env }
    }

    pub fn resolve(&self, host_port: &str) -> Result<Resolution, ResolutionError> {
        let (host, port) = split_host_port(host_port);
        let port = (!port.is_empty()).then(|| port.to_string());

        if host.parse::<IpAddr>().is_ok() {
            return Ok(Resolution {
                host: host.to_string(),
                port,
                source: ResolutionSource::Literal,
            });
        }

        let source = match self.lookup.lookup(host) {
            Ok(()) => {
                return Ok(Resolution {
                    host: host.to_string(),
                    port,
                    source: ResolutionSource::Dns,
                })
            }
            Err(e) => e,
        };

        if !host.contains('.') {
            let name = service_env_name(host);
            let env_host = self.env.var(&format!("{name}_SERVICE_HOST"));
            if let Some(ip) = env_host.filter(|h| h.parse::<IpAddr>().is_ok()) {
                let env_port = self
                    .env
                    .var(&format!("{name}_SERVICE_PORT"))
                    .filter(|p| !p.is_empty());
                tracing::debug!(host = %host, service_host = %ip, "Resolved from service environment");
                return Ok(Resolution {
                    host: ip,
                    port: env_port,
                    source: ResolutionSource::ServiceEnv,
                });
            }
        }

        Err(ResolutionError::UnknownServiceHost {
            host: host.to_string(),
            source,
        })
    }
}

/// `my-svc` → `MY_SVC`.
pub fn service_env_name(host: &str) -> String {
    host.to_uppercase().replace('-', "_")
}

/// Split `host[:port]`. Unbracketed strings with several colons are taken
/// to be bare IPv6 addresses with no port.
pub fn split_host_port(input: &str) -> (&str, &str) {
    if let Some(rest) = input.strip_prefix('[') {
        if let Some((host, after)) = rest.split_once(']') {
            return (host, after.strip_prefix(':').unwrap_or(""));
        }
    }
    match input.rfind(':') {
        Some(i) if !input[..i].contains(':') => (&input[..i], &input[i + 1..]),
        _ => (input, ""),
    }
}
