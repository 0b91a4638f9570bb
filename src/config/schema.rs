//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (port, TLS).
    pub listener: ListenerConfig,

    /// Static content settings.
    pub static_files: StaticConfig,

    /// Service definitions mapping path prefixes to upstreams, in registration order.
    pub services: Vec<ServiceConfig>,

    /// Outbound (upstream) connection settings.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Port to listen on, on all interfaces.
    pub port: u16,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self { port: 80, tls: None }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Static content configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Serve static content at all.
    pub enabled: bool,

    /// Directory to serve files from.
    pub root: PathBuf,

    /// Path prefix the static handler is mounted on.
    pub prefix: String,

    /// File served from the nearest ancestor directory when a path is missing.
    pub default_page: Option<String>,

    /// `Cache-Control` max-age in seconds; 0 disables the header.
    pub max_age_secs: u64,

    /// Enable gzip/deflate response compression.
    pub compress: bool,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: PathBuf::from("."),
            prefix: "/".to_string(),
            default_page: None,
            max_age_secs: 0,
            compress: false,
        }
    }
}

/// A proxied backend service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Path prefix to match (e.g. "/api").
    pub prefix: String,

    /// Upstream URL (e.g. "http://backend:8080/base").
    pub url: String,
}

/// Settings shared by every outbound connection.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Additional CA certificates (PEM) trusted on top of the system roots.
    pub ca_certs: Vec<PathBuf>,

    /// Skip upstream certificate validation entirely. Insecure.
    pub skip_cert_validation: bool,

    /// File holding the bearer token injected into every service.
    pub bearer_token_file: Option<PathBuf>,

    /// Add `Access-Control-Allow-Origin: *` to proxied responses.
    pub cors: bool,

    /// Abort startup when a service host cannot be resolved.
    pub fail_on_unknown_services: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log every request/response at INFO.
    pub access_logging: bool,

    /// Prometheus endpoint bind address; metrics are off when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            access_logging: false,
            metrics_address: None,
        }
    }
}
