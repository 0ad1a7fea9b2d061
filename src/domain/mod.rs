//! Domain layer for the record relay
//!
//! This module contains the record model, the error taxonomy and the ports
//! the pipeline needs from its cache store and message queue.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{CacheError, PipelineError, PipelineResult, QueueError};
