//! TLS configuration and certificate loading.
//!
//! Covers both directions: the listener's certificate/key pair and the trust
//! store used for every upstream connection (system roots plus any extra CA
//! files, or no verification at all when explicitly requested).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use thiserror::Error;

/// Certificate, key, or credential file problems. Always fatal at startup.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("couldn't read CA file {}: {source}", path.display())]
    ReadCa {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't load PEM data from CA file {}", path.display())]
    NoCertificates { path: PathBuf },

    #[error("could not load bearer token file {}: {source}", path.display())]
    ReadToken {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bearer token in {} is unusable: {reason}", path.display())]
    InvalidToken { path: PathBuf, reason: String },

    #[error("listener certificate: {0}")]
    ServerTls(#[source] std::io::Error),

    #[error("TLS configuration: {0}")]
    Tls(#[from] rustls::Error),
}

/// The process crypto provider.
pub fn crypto_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, CertificateError> {
    for path in [cert_path, key_path] {
        if !path.exists() {
            return Err(CertificateError::ServerTls(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }
    }

    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(CertificateError::ServerTls)
}

/// Read every certificate in a PEM file. An empty file is an error.
pub fn load_ca_file(path: &Path) -> Result<Vec<CertificateDer<'static>>, CertificateError> {
    let file = File::open(path).map_err(|source| CertificateError::ReadCa {
        path: path.to_path_buf(),
        source,
    })?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| CertificateError::ReadCa {
            path: path.to_path_buf(),
            source,
        })?;

    if certs.is_empty() {
        return Err(CertificateError::NoCertificates {
            path: path.to_path_buf(),
        });
    }
    Ok(certs)
}

/// Client config for upstream connections.
///
/// `skip_verification` disables certificate validation entirely. This is
/// insecure and only meant for development against self-signed upstreams.
pub fn upstream_client_config(
    ca_files: &[PathBuf],
    skip_verification: bool,
) -> Result<ClientConfig, CertificateError> {
    let provider = crypto_provider();
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    if skip_verification {
        tracing::warn!("Upstream certificate validation is disabled");
        return Ok(builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification(provider)))
            .with_no_client_auth());
    }

    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        tracing::debug!(error = %err, "Skipping unreadable system certificate");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    tracing::debug!(added, ignored, "Loaded system trust roots");

    for path in ca_files {
        let certs = load_ca_file(path)?;
        let (added, _) = roots.add_parsable_certificates(certs);
        if added == 0 {
            return Err(CertificateError::NoCertificates { path: path.clone() });
        }
        tracing::info!(path = %path.display(), certificates = added, "Trusting additional CA file");
    }

    Ok(builder.with_root_certificates(roots).with_no_client_auth())
}

/// Accepts any server certificate. Signatures are still checked so the
/// handshake itself stays well-formed.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
