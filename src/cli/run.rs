//! Wiring of the relay from configuration to running workers.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::adapters::file_source::feed_identifiers;
use crate::adapters::redis::{connection_info, RedisCacheStore, RedisPool, RedisStreamQueue};
use crate::cli::Cli;
use crate::domain::models::Config;
use crate::domain::ports::{CacheStore, MessageQueue};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::{LogConfig, LoggerImpl};
use crate::services::{
    identifier_queue, CacheProxy, DeliveryPipeline, DeliveryRetrier, Enricher, WorkerPool,
    WorkerPoolConfig, WorkerStats,
};

/// Load configuration named by the CLI, falling back to the default search.
pub fn load_config(cli: &Cli) -> Result<Config> {
    match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Install the global logger described by the logging section.
pub fn init_logging(config: &Config) -> Result<LoggerImpl> {
    let log_config = LogConfig::try_from(&config.logging)?;
    LoggerImpl::init(&log_config)
}

/// Copy of `config` that is safe to print.
pub fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.cache.password.is_some() {
        shown.cache.password = Some("[REDACTED]".to_string());
    }
    shown
}

/// Connect to Redis and run the relay over `input` to completion.
pub async fn execute(config: &Config, input: &Path) -> Result<WorkerStats> {
    info!(version = env!("CARGO_PKG_VERSION"), "record-relay starting");
    config.log_summary();

    let conn_info = connection_info(&config.cache).context("Invalid cache address")?;
    let pool_size = config.cache.effective_pool_size(config.worker.workers);
    let pool = RedisPool::connect(conn_info, pool_size, Duration::from_secs(config.cache.timeout_secs))
        .await
        .context("Failed to connect to cache")?;
    info!(connections = pool.size(), "cache pool ready");
    let store: Arc<dyn CacheStore> = Arc::new(RedisCacheStore::new(Arc::new(pool)));

    let queue: Arc<dyn MessageQueue> = Arc::new(
        RedisStreamQueue::connect(&config.queue.url, config.queue.max_block_count)
            .await
            .context("Failed to connect to outbound queue")?,
    );

    relay(config, store, queue, input).await
}

/// Drive identifiers from `input` through the pipeline built on `store` and `queue`.
pub async fn relay(
    config: &Config,
    store: Arc<dyn CacheStore>,
    queue: Arc<dyn MessageQueue>,
    input: &Path,
) -> Result<WorkerStats> {
    let pipeline = build_pipeline(config, store, queue);
    pipeline.ensure_block_fits(config.queue.max_block_count)?;

    let pool = WorkerPool::new(
        WorkerPoolConfig {
            workers: config.worker.workers,
            batch_capacity: config.queue.max_block_count,
            idle_timeout: Duration::from_secs(config.worker.flush_timeout_secs),
            progress_interval: config.worker.progress_interval,
        },
        Arc::new(pipeline),
    );

    let (sender, identifiers) = identifier_queue(config.worker.worker_queue_size);
    let workers = tokio::spawn(pool.run(identifiers));

    let fed = feed_identifiers(input, &sender).await;
    drop(sender);

    // a failed pool closes the queue, so its error explains a feed failure
    let stats = workers.await.context("Worker pool task panicked")??;
    let queued = fed?;

    info!(queued, records = stats.records, flushes = stats.flushes, "relay finished");
    Ok(stats)
}

fn build_pipeline(
    config: &Config,
    store: Arc<dyn CacheStore>,
    queue: Arc<dyn MessageQueue>,
) -> DeliveryPipeline {
    let cache = CacheProxy::with_slow_request(
        store,
        Duration::from_millis(config.cache.slow_request_ms),
    );
    let enricher = Enricher::new(cache)
        .with_operation(config.metadata.operation.clone())
        .with_existence_check(config.cache.verify_exists);

    DeliveryPipeline::new(
        enricher,
        DeliveryRetrier::new(queue, config.queue.send_retries),
        config.queue.out_queue.clone(),
    )
    .with_cache_queue(config.queue.cache_queue.clone())
}
