pub mod config;
pub mod record;

pub use config::{CacheConfig, Config, LoggingConfig, MetadataConfig, QueueConfig, WorkerConfig};
pub use record::{Attribute, CacheEntry, DeliveryOutcome, Identifier, OutboundMessage};
