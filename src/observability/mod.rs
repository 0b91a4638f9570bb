//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG / --log-level)
//!     → Metrics endpoint (Prometheus scrape, when configured)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through request and response headers
//! - Access logging is the HTTP trace layer raised to INFO
//! - Metrics are cheap when no recorder is installed

pub mod logging;
pub mod metrics;
