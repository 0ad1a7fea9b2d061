//! Enrichment of flushed batches with cached record data.

use tracing::{debug, warn};

use crate::domain::errors::PipelineResult;
use crate::domain::models::{Identifier, OutboundMessage};
use crate::services::cache_proxy::CacheProxy;

/// Builds outbound messages for a batch of identifiers.
#[derive(Clone)]
pub struct Enricher {
    cache: CacheProxy,
    operation: Option<String>,
    verify_exists: bool,
}

impl Enricher {
    /// Create an enricher reading from `cache`.
    pub fn new(cache: CacheProxy) -> Self {
        Self {
            cache,
            operation: None,
            verify_exists: false,
        }
    }

    /// Attach an `operation` attribute to every message.
    pub fn with_operation(mut self, operation: Option<String>) -> Self {
        self.operation = operation;
        self
    }

    /// Run a bulk existence check before each fetch.
    ///
    /// A negative result is logged only; the fetch still runs.
    pub fn with_existence_check(mut self, enabled: bool) -> Self {
        self.verify_exists = enabled;
        self
    }

    /// Look up `batch` in the cache and build one message per complete entry.
    ///
    /// Identifiers without a complete cache entry are dropped with a warning.
    pub async fn enrich(&self, batch: &[Identifier]) -> PipelineResult<Vec<OutboundMessage>> {
        if self.verify_exists && !self.cache.exists(batch).await? {
            debug!(count = batch.len(), "batch has keys missing from the cache");
        }

        let entries = self.cache.get(batch).await?;
        if entries.len() < batch.len() {
            warn!(
                requested = batch.len(),
                found = entries.len(),
                "cache returned fewer entries than requested"
            );
        }

        let operation = self.operation.as_deref();
        Ok(entries
            .into_iter()
            .map(|(id, entry)| OutboundMessage::from_entry(&id, entry, operation))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCacheStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_enrich_builds_one_message_per_entry() {
        let store = Arc::new(InMemoryCacheStore::new());
        for i in 0..7 {
            store
                .put_entry(&format!("k{i}"), "xml", "src", format!("<{i}/>").as_bytes())
                .await;
        }
        let enricher = Enricher::new(CacheProxy::new(store)).with_operation(Some("update".into()));

        let batch: Vec<Identifier> = (0..10).map(|i| Identifier::new(format!("k{i}"))).collect();
        let messages = enricher.enrich(&batch).await.unwrap();

        assert_eq!(messages.len(), 7);
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg.record_id(), Some(format!("k{i}").as_str()));
            assert_eq!(msg.payload, format!("<{i}/>").into_bytes());
            assert_eq!(msg.attribute("operation"), Some("update"));
        }
    }

    #[tokio::test]
    async fn test_existence_check_does_not_block_fetch() {
        let store = Arc::new(InMemoryCacheStore::new());
        store.put_entry("a", "xml", "src", b"<a/>").await;
        let enricher = Enricher::new(CacheProxy::new(store.clone())).with_existence_check(true);

        let messages = enricher
            .enrich(&[Identifier::new("a"), Identifier::new("b")])
            .await
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(store.exists_calls(), 1);
        assert_eq!(store.fetch_calls(), 1);
    }
}
