//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - CacheStore: bulk existence checks and pipelined field fetches
//! - MessageQueue: bulk message puts with per-message failure reporting
//!
//! These traits define the contracts that keep the batching pipeline
//! independent of the concrete cache and queue implementations.

pub mod cache_store;
pub mod message_queue;

pub use cache_store::{CacheStore, FieldSet};
pub use message_queue::MessageQueue;
