//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, headers, query)
//!     → table.rs (longest matching service prefix)
//!         no match → static content
//!     → protocol.rs (HTTP or WebSocket upgrade)
//!     → Return: matched ServiceRoute + Protocol
//!
//! Route Compilation (at startup):
//!     ServiceConfig[] + resolved hosts
//!     → route.rs ServiceRoute values
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod protocol;
pub mod route;
pub mod table;

pub use protocol::{classify, is_upgrade_request, Protocol};
pub use route::{BearerToken, ServiceRoute};
pub use table::RouteTable;
