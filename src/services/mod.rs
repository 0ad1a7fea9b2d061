//! Service layer: the batching, enrichment and delivery pipeline.

pub mod batch_assembler;
pub mod cache_proxy;
pub mod delivery_pipeline;
pub mod delivery_retrier;
pub mod enrichment;
pub mod worker_pool;

pub use batch_assembler::{BatchAssembler, FlushTrigger};
pub use cache_proxy::CacheProxy;
pub use delivery_pipeline::DeliveryPipeline;
pub use delivery_retrier::DeliveryRetrier;
pub use enrichment::Enricher;
pub use worker_pool::{
    identifier_queue, BatchSink, IdentifierQueue, IdentifierSender, WorkerPool, WorkerPoolConfig,
    WorkerStats,
};
