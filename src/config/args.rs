//! Command-line flags.
//!
//! Flags are layered over an optional TOML file: scalar flags override the
//! file, repeatable flags append to the file's lists.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::{ProxyConfig, ServiceConfig, TlsConfig};
use crate::config::validation::validate_config;

#[derive(Debug, Parser)]
#[command(name = "portico")]
#[command(about = "Serve static content and reverse proxy to backend services", long_about = None)]
pub struct Args {
    /// TOML configuration file
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// The port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory to serve static files from
    #[arg(short = 'w', long = "www")]
    pub www: Option<PathBuf>,

    /// Prefix to serve static files on
    #[arg(long = "www-prefix")]
    pub www_prefix: Option<String>,

    /// Cache-Control max-age for static content, in seconds
    #[arg(long = "max-age")]
    pub max_age: Option<u64>,

    /// Default page to send if page not found
    #[arg(short = 'd', long = "default-page")]
    pub default_page: Option<String>,

    /// A service to proxy to, as <prefix>=<url>
    #[arg(short = 's', long = "service")]
    pub services: Vec<ServiceConfig>,

    /// CA certs used to verify proxied server certificates
    #[arg(long = "ca-cert")]
    pub ca_certs: Vec<PathBuf>,

    /// Certificate file to serve TLS with
    #[arg(long = "tls-cert")]
    pub tls_cert: Option<PathBuf>,

    /// Private key file to serve TLS with
    #[arg(long = "tls-key")]
    pub tls_key: Option<PathBuf>,

    /// Skip remote certificate validation - dangerous!
    #[arg(long = "skip-cert-validation")]
    pub skip_cert_validation: bool,

    /// Enable access logging
    #[arg(short = 'l', long = "access-logging")]
    pub access_logging: bool,

    /// Enable gzip/deflate response compression of static content
    #[arg(long)]
    pub compress: bool,

    /// Fail on service hosts that cannot be resolved
    #[arg(long = "fail-on-unknown-services")]
    pub fail_on_unknown_services: bool,

    /// Whether to serve static content
    #[arg(long = "serve-www", action = ArgAction::Set)]
    pub serve_www: Option<bool>,

    /// Add Access-Control-Allow-Origin: * to proxied responses
    #[arg(long)]
    pub cors: bool,

    /// File holding the Bearer token for the Authorization header
    #[arg(long = "bearer-token")]
    pub bearer_token: Option<PathBuf>,

    /// Prometheus metrics bind address (e.g. 0.0.0.0:9090)
    #[arg(long = "metrics-address")]
    pub metrics_address: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
}

impl Args {
    /// Merge flags over the config file (or defaults) and validate the result.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.port = port;
        }
        match (self.tls_cert, self.tls_key) {
            (None, None) => {}
            (cert, key) => {
                config.listener.tls = Some(TlsConfig {
                    cert_path: cert.unwrap_or_default(),
                    key_path: key.unwrap_or_default(),
                });
            }
        }

        let static_files = &mut config.static_files;
        if let Some(www) = self.www {
            static_files.root = www;
        }
        if let Some(prefix) = self.www_prefix {
            static_files.prefix = prefix;
        }
        if let Some(max_age) = self.max_age {
            static_files.max_age_secs = max_age;
        }
        if let Some(page) = self.default_page.filter(|p| !p.is_empty()) {
            static_files.default_page = Some(page);
        }
        if let Some(serve) = self.serve_www {
            static_files.enabled = serve;
        }
        static_files.compress |= self.compress;

        config.services.extend(self.services);

        let upstream = &mut config.upstream;
        upstream.ca_certs.extend(self.ca_certs);
        upstream.skip_cert_validation |= self.skip_cert_validation;
        upstream.fail_on_unknown_services |= self.fail_on_unknown_services;
        upstream.cors |= self.cors;
        if let Some(token) = self.bearer_token {
            upstream.bearer_token_file = Some(token);
        }

        let observability = &mut config.observability;
        observability.access_logging |= self.access_logging;
        if let Some(addr) = self.metrics_address {
            observability.metrics_address = Some(addr);
        }
        if let Some(level) = self.log_level {
            observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
