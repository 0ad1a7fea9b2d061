//! In-memory adapters for tests and local runs.

mod cache_store;
mod message_queue;

pub use cache_store::InMemoryCacheStore;
pub use message_queue::{InMemoryQueue, PutCall, PutScript};
