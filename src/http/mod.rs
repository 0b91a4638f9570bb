//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, trace / access log)
//!     → dispatch.rs (longest-prefix route match)
//!         service route, upgrade request → websocket.rs (bridge)
//!         service route, plain request   → proxy.rs (CORS → auth → forward)
//!         no route, under static prefix  → static_files.rs (compress → cache → files)
//!         otherwise                      → 404
//!     → response.rs (error bodies), headers.rs (hop-by-hop, X-Forwarded-For)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod headers;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;
pub mod websocket;

pub use dispatch::{Dispatcher, StaticMount};
pub use proxy::{ProxyError, ReverseProxy};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
pub use static_files::{StaticError, StaticFiles};
pub use websocket::WebSocketBridge;
