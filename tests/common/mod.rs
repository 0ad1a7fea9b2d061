//! Common test utilities for integration tests
//!
//! Shared fixtures for building a relay pipeline on the in-memory adapters.

#![allow(dead_code)]

use std::sync::Arc;

use record_relay::adapters::memory::{InMemoryCacheStore, InMemoryQueue};
use record_relay::domain::models::{Config, Identifier};
use record_relay::services::{CacheProxy, DeliveryPipeline, DeliveryRetrier, Enricher};

/// Primary queue name used by the fixtures
pub const OUT_QUEUE: &str = "records-out";

/// Secondary queue name used by the fixtures
pub const CACHE_QUEUE: &str = "records-cache";

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Identifiers `rec-0000` .. `rec-{n-1}`
pub fn identifiers(n: usize) -> Vec<Identifier> {
    (0..n).map(|i| Identifier::new(format!("rec-{i:04}"))).collect()
}

/// Store holding a complete entry for each of `ids`
pub async fn seeded_store(ids: &[Identifier]) -> Arc<InMemoryCacheStore> {
    let store = Arc::new(InMemoryCacheStore::new());
    for id in ids {
        let payload = format!("<record id=\"{id}\"/>");
        store
            .put_entry(id.as_str(), "marc", "catalog", payload.as_bytes())
            .await;
    }
    store
}

/// Pipeline over the in-memory adapters delivering to [`OUT_QUEUE`]
pub fn pipeline(
    store: Arc<InMemoryCacheStore>,
    queue: Arc<InMemoryQueue>,
    send_retries: u32,
) -> DeliveryPipeline {
    DeliveryPipeline::new(
        Enricher::new(CacheProxy::new(store)),
        DeliveryRetrier::new(queue, send_retries),
        OUT_QUEUE,
    )
}

/// Valid configuration for relay runs
pub fn relay_config(workers: usize, max_block_count: usize) -> Config {
    let mut config = Config::default();
    config.queue.out_queue = OUT_QUEUE.to_string();
    config.queue.max_block_count = max_block_count;
    config.worker.workers = workers;
    config.worker.worker_queue_size = 16;
    config.worker.flush_timeout_secs = 1;
    config
}
