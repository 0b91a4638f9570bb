//! Upstream host discovery.
//!
//! # Data Flow
//! ```text
//! configured upstream host[:port]
//!     → resolver.rs
//!         IP literal?            → Resolution (literal)
//!         env.rs DNS lookup ok?  → Resolution (dns, unchanged)
//!         short name + env.rs <NAME>_SERVICE_HOST/PORT → Resolution (service-env)
//!     → else ResolutionError::UnknownServiceHost
//! ```
//!
//! # Design Decisions
//! - Runs once per service at startup, never on the request path
//! - DNS and environment are trait seams so resolution is testable
//! - Resolver holds no mutable state: same input, same output

pub mod env;
pub mod resolver;

pub use env::{HostLookup, ProcessEnv, ServiceEnv, SystemLookup};
pub use resolver::{Resolution, ResolutionError, ResolutionSource, Resolver};
