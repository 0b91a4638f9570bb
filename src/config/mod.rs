//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)            command line (clap)
//!     → loader.rs (parse)           → args.rs (flags, service specs)
//!                 ↘                 ↙
//!                  merged ProxyConfig
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → consumed once by lifecycle::startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde, clap) from semantic checks

pub mod args;
pub mod loader;
pub mod schema;
pub mod validation;

pub use args::Args;
pub use loader::{load_config, ConfigError};
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProxyConfig;
pub use schema::ServiceConfig;
pub use schema::StaticConfig;
pub use schema::TlsConfig;
pub use schema::UpstreamConfig;
pub use validation::ValidationError;
