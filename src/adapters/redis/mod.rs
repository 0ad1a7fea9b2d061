//! Redis adapters
//!
//! - `RedisPool`: round-robin pool of auto-reconnecting connections
//! - `RedisCacheStore`: cache store backed by hashes, read with pipelined HMGET
//! - `RedisStreamQueue`: outbound queue backed by streams, written with pipelined XADD

pub mod cache_store;
pub mod connection;
pub mod stream_queue;

pub use cache_store::RedisCacheStore;
pub use connection::{connection_info, pipeline_replies, RedisPool};
pub use stream_queue::RedisStreamQueue;
