//! Shared outbound transport.
//!
//! One pooled client serves every route, both for forwarded HTTP requests
//! and for the upgrade handshake of bridged WebSockets. The pool is the
//! only state mutated in steady state; the client is internally synchronised.

use std::fs;
use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::UpstreamConfig;
use crate::net::tls::{upstream_client_config, CertificateError};
use crate::routing::BearerToken;

pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the shared client: system roots + extra CA files, HTTP/1.1 so
/// protocol upgrades work against every upstream.
pub fn build_client(config: &UpstreamConfig) -> Result<UpstreamClient, CertificateError> {
    let tls = upstream_client_config(&config.ca_certs, config.skip_cert_validation)?;

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_nodelay(true);
    http.set_connect_timeout(Some(Duration::from_secs(10)));

    let https = HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Ok(Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(90))
        .build(https))
}

/// Read the bearer token file. Contents are used verbatim, untrimmed.
///
/// A token must fit in an `Authorization` header, so a file ending in a line
/// break (the usual result of `echo token > file`) is rejected by name.
pub fn load_bearer_token(path: &Path) -> Result<BearerToken, CertificateError> {
    let bytes = fs::read(path).map_err(|source| CertificateError::ReadToken {
        path: path.to_path_buf(),
        source,
    })?;
    let token = String::from_utf8(bytes).map_err(|_| CertificateError::InvalidToken {
        path: path.to_path_buf(),
        reason: "not valid UTF-8".to_string(),
    })?;
    let reason = if token.ends_with('\n') || token.ends_with('\r') {
        "ends with a line break, which a header value cannot carry; write the file without a trailing newline"
    } else {
        "contains characters not allowed in a header"
    };
    BearerToken::new(token).map_err(|_| CertificateError::InvalidToken {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    })
}
