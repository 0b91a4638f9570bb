//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject malformed service definitions before they reach routing
//! - Validate prefixes, default page name, TLS pairing
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Duplicate prefixes are not errors; the route table keeps the first one

use thiserror::Error;

use crate::config::schema::{ProxyConfig, ServiceConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service prefix `{0}` must start with `/`")]
    ServicePrefix(String),

    #[error("service `{prefix}` is malformed: {reason}")]
    ServiceUrl { prefix: String, reason: String },

    #[error("static prefix `{0}` must start with `/`")]
    StaticPrefix(String),

    #[error("default page `{0}` must be a plain file name")]
    DefaultPage(String),

    #[error("TLS needs both a certificate and a key")]
    IncompleteTls,
}

/// Check a loaded configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for service in &config.services {
        if !service.prefix.starts_with('/') {
            errors.push(ValidationError::ServicePrefix(service.prefix.clone()));
        }
        let spec = format!("{}={}", service.prefix, service.url);
        if let Err(e) = spec.parse::<ServiceConfig>() {
            errors.push(ValidationError::ServiceUrl {
                prefix: service.prefix.clone(),
                reason: e.to_string(),
            });
        }
    }

    let static_files = &config.static_files;
    if !static_files.prefix.starts_with('/') {
        errors.push(ValidationError::StaticPrefix(static_files.prefix.clone()));
    }
    if let Some(page) = &static_files.default_page {
        if page.is_empty() || page.contains('/') || page == "." || page == ".." {
            errors.push(ValidationError::DefaultPage(page.clone()));
        }
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.as_os_str().is_empty() || tls.key_path.as_os_str().is_empty() {
            errors.push(ValidationError::IncompleteTls);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
