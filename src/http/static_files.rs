//! Static file serving with default-page fallback.
//!
//! # Responsibilities
//! - Resolve the full request path against the root directory
//! - Serve existing regular files directly
//! - Answer directories and missing paths with the nearest default page
//! - Apply Cache-Control and compression to every static response
//!
//! # Design Decisions
//! - The mount prefix is not stripped: paths resolve as-is under the root
//! - Paths containing `..` never leave the root (answered as not found)
//! - Fallback walks from the full path up to the root, inclusive
//! - A directory is never listed and never gets an implicit `index.html`

use std::{
    convert::Infallible,
    io,
    path::PathBuf,
};

use axum::{
    body::Body,
    http::{header::CACHE_CONTROL, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use tower::{service_fn, util::BoxCloneSyncService, Layer, ServiceBuilder, ServiceExt};
use tower_http::{
    compression::CompressionLayer,
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
};

use crate::config::StaticConfig;
use crate::http::response::{error_response, not_found};

pub type StaticService = BoxCloneSyncService<Request<Body>, Response, Infallible>;

#[derive(Debug, thiserror::Error)]
pub enum StaticError {
    #[error("not found")]
    NotFound,

    #[error("failed to stat {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl IntoResponse for StaticError {
    fn into_response(self) -> Response {
        match self {
            StaticError::NotFound => not_found(),
            StaticError::Io { path, source } => {
                tracing::error!(path = %path.display(), error = %source, "Static file lookup failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error\n")
            }
        }
    }
}

/// Serves files under `root`.
#[derive(Clone)]
pub struct StaticFiles {
    root: PathBuf,
    default_page: Option<String>,
    serve_dir: ServeDir,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, default_page: Option<String>) -> Self {
        let root = root.into();
        let serve_dir = ServeDir::new(&root).append_index_html_on_directories(false);
        Self {
            root,
            default_page: default_page.filter(|p| !p.is_empty()),
            serve_dir,
        }
    }

    pub async fn serve(&self, req: Request<Body>) -> Result<Response, StaticError> {
        let segments = decode_segments(req.uri().path()).ok_or(StaticError::NotFound)?;
        let target: PathBuf = self.root.join(segments.iter().collect::<PathBuf>());

        match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_file() => Ok(self.serve_dir.clone().oneshot(req).await.into_response()),
            Ok(_) => self.serve_fallback(segments, req).await,
            Err(e) if is_missing(&e) => self.serve_fallback(segments, req).await,
            Err(source) => Err(StaticError::Io { path: target, source }),
        }
    }

    async fn serve_fallback(
        &self,
        segments: Vec<String>,
        req: Request<Body>,
    ) -> Result<Response, StaticError> {
        let Some(page) = &self.default_page else {
            return Err(StaticError::NotFound);
        };

        for candidate in fallback_candidates(&segments, page) {
            let full = self.root.join(&candidate);
            match tokio::fs::metadata(&full).await {
                Ok(meta) if meta.is_file() => {
                    tracing::debug!(
                        path = %req.uri().path(),
                        fallback = %candidate.display(),
                        "Serving default page"
                    );
                    return Ok(ServeFile::new(&full).oneshot(req).await.into_response());
                }
                Ok(_) => {}
                Err(e) if is_missing(&e) => {}
                Err(source) => return Err(StaticError::Io { path: full, source }),
            }
        }
        Err(StaticError::NotFound)
    }
}

/// Candidate default pages for `segments`, most specific first, ending at
/// the root's own default page.
pub fn fallback_candidates(segments: &[String], page: &str) -> Vec<PathBuf> {
    (0..=segments.len())
        .rev()
        .map(|n| segments[..n].iter().collect::<PathBuf>().join(page))
        .collect()
}

/// Percent-decode `path` into normal segments. `None` if any segment is `..`.
fn decode_segments(path: &str) -> Option<Vec<String>> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    let mut segments = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => segments.push(s.to_string()),
        }
    }
    Some(segments)
}

fn is_missing(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory)
}

/// `max-age=<secs>, public, must-revalidate, proxy-revalidate`
pub fn cache_control_value(max_age_secs: u64) -> HeaderValue {
    HeaderValue::from_str(&format!(
        "max-age={max_age_secs}, public, must-revalidate, proxy-revalidate"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
}

/// Build the static handler chain: compression (outermost, when enabled),
/// then Cache-Control (when max-age is positive), then the file handler.
pub fn static_service(config: &StaticConfig) -> StaticService {
    let files = StaticFiles::new(&config.root, config.default_page.clone());
    let mut service: StaticService = BoxCloneSyncService::new(service_fn(move |req| {
        let files = files.clone();
        async move { Ok::<_, Infallible>(files.serve(req).await.into_response()) }
    }));

    if config.max_age_secs > 0 {
        service = BoxCloneSyncService::new(
            SetResponseHeaderLayer::overriding(CACHE_CONTROL, cache_control_value(config.max_age_secs))
                .layer(service),
        );
    }
    if config.compress {
        service = BoxCloneSyncService::new(
            ServiceBuilder::new()
                .map_response(IntoResponse::into_response)
                .layer(CompressionLayer::new())
                .service(service),
        );
    }
    service
}
