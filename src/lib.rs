//! Static file server and multi-upstream HTTP / WebSocket gateway.

// Core subsystems
pub mod config;
pub mod discovery;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
