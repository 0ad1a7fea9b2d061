//! Adapters implementing the domain ports.

pub mod file_source;
pub mod memory;
pub mod redis;
