//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Listener side:
//!     tls.rs (optional certificate/key for the listener)
//!     → Hand off to HTTP layer
//!
//! Upstream side:
//!     tls.rs (system roots + CA files, or no verification)
//!     → upstream.rs (one pooled HTTP/1.1 client for all routes)
//!     → connection.rs (tracks each live WebSocket bridge)
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled transparently
//! - A single outbound client is shared by every request task
//! - Every bridge holds a guard so its release is observable

pub mod connection;
pub mod tls;
pub mod upstream;

pub use connection::{BridgeGuard, BridgeTracker, SessionId};
pub use tls::CertificateError;
pub use upstream::{build_client, load_bearer_token, UpstreamClient};
