//! Record Relay - batching cache-enrichment relay
//!
//! Record identifiers arrive on a shared channel, are grouped into batches by
//! a pool of workers, enriched with cached record data in one bulk lookup per
//! batch, and delivered to an outbound queue. Partial delivery failures are
//! retried for the failed messages only.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the cache/queue ports
//! - **Service Layer** (`services`): batching, enrichment, delivery and the worker pool
//! - **Adapters** (`adapters`): Redis and in-memory implementations of the ports
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface and wiring
//!
//! # Example
//!
//! ```ignore
//! use record_relay::adapters::memory::{InMemoryCacheStore, InMemoryQueue};
//! use record_relay::services::{identifier_queue, CacheProxy, DeliveryPipeline,
//!     DeliveryRetrier, Enricher, WorkerPool, WorkerPoolConfig};
//!
//! let pipeline = DeliveryPipeline::new(
//!     Enricher::new(CacheProxy::new(store)),
//!     DeliveryRetrier::new(queue, 3),
//!     "records-out",
//! );
//! let (tx, rx) = identifier_queue(1000);
//! let stats = WorkerPool::new(WorkerPoolConfig::default(), Arc::new(pipeline)).run(rx).await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{CacheError, PipelineError, PipelineResult, QueueError};
pub use domain::models::{
    CacheEntry, Config, DeliveryOutcome, Identifier, LoggingConfig, OutboundMessage,
};
pub use domain::ports::{CacheStore, MessageQueue};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    identifier_queue, BatchSink, CacheProxy, DeliveryPipeline, DeliveryRetrier, Enricher,
    FlushTrigger, WorkerPool, WorkerPoolConfig,
};
