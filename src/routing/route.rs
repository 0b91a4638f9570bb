//! Service route definitions.

use std::fmt;

use axum::http::header::{HeaderValue, InvalidHeaderValue};
use url::Url;

/// A static credential injected into outbound requests.
///
/// The raw token is used verbatim; `Debug` never prints it.
#[derive(Clone)]
pub struct BearerToken {
    token: String,
    header: HeaderValue,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Result<Self, InvalidHeaderValue> {
        let token = token.into();
        let mut header = HeaderValue::from_str(&format!("Bearer {token}"))?;
        header.set_sensitive(true);
        Ok(Self { token, header })
    }

    /// The raw token, as used for `access_token` query parameters.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// `Bearer <token>`, marked sensitive.
    pub fn header_value(&self) -> HeaderValue {
        self.header.clone()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// One configured backend mount. Built once at startup, never mutated.
#[derive(Debug, Clone)]
pub struct ServiceRoute {
    /// Path prefix this route is mounted on.
    pub prefix: String,
    /// Upstream URL as configured. Its scheme, path and query are used;
    /// connections go to `resolved_host` instead of its host.
    pub upstream: Url,
    /// `host[:port]` used for outbound connections.
    pub resolved_host: String,
    pub auth_token: Option<BearerToken>,
    pub cors_enabled: bool,
}

impl ServiceRoute {
    /// Remove the route prefix from the start of `path`, at most once.
    pub fn strip_prefix<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.prefix.as_str()).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(prefix: &str) -> ServiceRoute {
        ServiceRoute {
            prefix: prefix.into(),
            upstream: Url::parse("http://backend:8080").unwrap(),
            resolved_host: "backend:8080".into(),
            auth_token: None,
            cors_enabled: false,
        }
    }

    #[test]
    fn strips_prefix_once() {
        let r = route("/api");
        assert_eq!(r.strip_prefix("/api/x"), "/x");
        assert_eq!(r.strip_prefix("/api/api/x"), "/api/x");
        assert_eq!(r.strip_prefix("/api"), "");
        assert_eq!(r.strip_prefix("/other"), "/other");
    }

    #[test]
    fn token_is_redacted() {
        let token = BearerToken::new("s3cret").unwrap();
        assert_eq!(token.as_str(), "s3cret");
        assert_eq!(token.header_value(), "Bearer s3cret");
        assert!(token.header_value().is_sensitive());
        assert!(!format!("{token:?}").contains("s3cret"));
    }

    #[test]
    fn token_with_newline_is_rejected() {
        assert!(BearerToken::new("abc\n").is_err());
    }
}
