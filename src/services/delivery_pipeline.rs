//! Flush sink that enriches a batch and delivers it to the outbound queues.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::models::Identifier;
use crate::services::batch_assembler::FlushTrigger;
use crate::services::delivery_retrier::DeliveryRetrier;
use crate::services::enrichment::Enricher;
use crate::services::worker_pool::BatchSink;

/// Enrichment followed by delivery to the primary and optional secondary queue.
pub struct DeliveryPipeline {
    enricher: Enricher,
    delivery: DeliveryRetrier,
    out_queue: String,
    cache_queue: Option<String>,
}

impl DeliveryPipeline {
    /// Create a pipeline delivering to `out_queue`.
    pub fn new(enricher: Enricher, delivery: DeliveryRetrier, out_queue: impl Into<String>) -> Self {
        Self {
            enricher,
            delivery,
            out_queue: out_queue.into(),
            cache_queue: None,
        }
    }

    /// Also deliver every batch to `cache_queue`; an empty name disables it.
    pub fn with_cache_queue(mut self, cache_queue: impl Into<String>) -> Self {
        let name = cache_queue.into();
        self.cache_queue = (!name.is_empty()).then_some(name);
        self
    }

    /// Check that a batch of `capacity` identifiers fits in one send.
    pub fn ensure_block_fits(&self, capacity: usize) -> PipelineResult<()> {
        let max = self.delivery.max_block_count();
        if capacity > max {
            return Err(PipelineError::BlockTooLarge {
                count: capacity,
                max,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BatchSink for DeliveryPipeline {
    async fn flush(&self, batch: &[Identifier], trigger: FlushTrigger) -> PipelineResult<()> {
        let messages = self.enricher.enrich(batch).await?;
        if messages.is_empty() {
            warn!(requested = batch.len(), %trigger, "no cache entries for batch, nothing to send");
            return Ok(());
        }

        self.delivery.send(&self.out_queue, &messages).await?;

        if let Some(ref cache_queue) = self.cache_queue {
            self.delivery.send(cache_queue, &messages).await?;
        }

        debug!(sent = messages.len(), requested = batch.len(), %trigger, "batch delivered");
        Ok(())
    }
}
