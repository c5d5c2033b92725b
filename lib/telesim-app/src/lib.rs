//! High-level application primitives.
//!
//! This crate provides the pieces needed to bootstrap the simulator before any instance runs: loading configuration
//! from the environment, initializing logging, and serving the metrics exposition endpoint.
#![deny(warnings)]
#![deny(missing_docs)]

pub mod api;
pub mod config;
pub mod deser;
pub mod logging;

/// Common imports.
pub mod prelude {
    pub use super::api::ExpositionServer;
    pub use super::config::{ConfigurationError, EnvironmentConfiguration};
    pub use super::logging::{fatal_and_exit, initialize_logging, LoggingConfiguration};
}
