//! Infrastructure layer module
//!
//! - Configuration management (figment layering, validation)
//! - Logging infrastructure (tracing subscriber, rolling file output)

pub mod config;
pub mod logging;
