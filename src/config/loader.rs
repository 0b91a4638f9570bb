//! Configuration loading from disk and from `<prefix>=<url>` service specs.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyConfig, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid service `{spec}`: {reason}")]
    InvalidService { spec: String, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ProxyConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parses `<prefix>=<url>`, splitting on the first `=`.
impl FromStr for ServiceConfig {
    type Err = ConfigError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidService {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let (prefix, url) = spec
            .split_once('=')
            .ok_or_else(|| invalid("expected <prefix>=<url>"))?;
        let prefix = prefix.trim();
        let url = url.trim();
        if prefix.is_empty() {
            return Err(invalid("empty prefix"));
        }

        let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host"));
        }

        Ok(ServiceConfig {
            prefix: prefix.to_string(),
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_service_spec() {
        let svc: ServiceConfig = "/api=http://backend:8080/v1".parse().unwrap();
        assert_eq!(svc.prefix, "/api");
        assert_eq!(svc.url, "http://backend:8080/v1");
    }

    #[test]
    fn service_spec_splits_on_first_equals() {
        let svc: ServiceConfig = "/q=http://backend/?a=b".parse().unwrap();
        assert_eq!(svc.prefix, "/q");
        assert_eq!(svc.url, "http://backend/?a=b");
    }

    #[test]
    fn rejects_malformed_service_specs() {
        for spec in [
            "/api",
            "=http://backend",
            "/api=not a url",
            "/api=ftp://backend",
            "/api=unix:/tmp/sock",
        ] {
            let err = spec.parse::<ServiceConfig>().unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidService { .. }),
                "{spec} should be rejected, got {err}"
            );
        }
    }

    #[test]
    fn loads_minimal_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[listener]
port = 8080

[static_files]
default_page = "index.html"
max_age_secs = 3600

[[services]]
prefix = "/api"
url = "http://backend:9000"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.static_files.prefix, "/");
        assert_eq!(config.static_files.default_page.as_deref(), Some("index.html"));
        assert_eq!(config.static_files.max_age_secs, 3600);
        assert_eq!(config.services.len(), 1);
        assert!(!config.upstream.fail_on_unknown_services);
    }

    #[test]
    fn load_reports_validation_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[services]]
prefix = "api"
url = "http://backend"
"#
        )
        .unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
