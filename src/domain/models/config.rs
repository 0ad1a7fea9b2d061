use serde::{Deserialize, Serialize};

/// Main configuration structure for the relay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Outbound queue configuration
    #[serde(default)]
    pub queue: QueueConfig,

    /// Worker pool configuration
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Cache store connection configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fixed metadata attached to every outbound message
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Log the effective configuration, one field per event.
    ///
    /// The cache password is never written out.
    pub fn log_summary(&self) {
        tracing::info!(out_queue = %self.queue.out_queue, "[CONFIG] queue.out_queue");
        tracing::info!(cache_queue = %self.queue.cache_queue, "[CONFIG] queue.cache_queue");
        tracing::info!(max_block_count = self.queue.max_block_count, "[CONFIG] queue.max_block_count");
        tracing::info!(send_retries = self.queue.send_retries, "[CONFIG] queue.send_retries");
        tracing::info!(workers = self.worker.workers, "[CONFIG] worker.workers");
        tracing::info!(
            worker_queue_size = self.worker.worker_queue_size,
            "[CONFIG] worker.worker_queue_size"
        );
        tracing::info!(
            flush_timeout_secs = self.worker.flush_timeout_secs,
            "[CONFIG] worker.flush_timeout_secs"
        );
        tracing::info!(host = %self.cache.host, port = self.cache.port, db = self.cache.db, "[CONFIG] cache address");
        tracing::info!(
            password = if self.cache.password.is_some() { "[REDACTED]" } else { "<none>" },
            "[CONFIG] cache.password"
        );
        tracing::info!(pool_size = self.cache.effective_pool_size(self.worker.workers), "[CONFIG] cache.pool_size");
        tracing::info!(timeout_secs = self.cache.timeout_secs, "[CONFIG] cache.timeout_secs");
        tracing::info!(verify_exists = self.cache.verify_exists, "[CONFIG] cache.verify_exists");
        tracing::info!(operation = ?self.metadata.operation, "[CONFIG] metadata.operation");

        if !self.queue.cache_queue_enabled() {
            tracing::info!("cache queue name is blank, record caching is DISABLED");
        }
    }
}

/// Outbound queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueueConfig {
    /// Connection URL of the queue transport
    #[serde(default = "default_queue_url")]
    pub url: String,

    /// Primary outbound queue name (required)
    #[serde(default)]
    pub out_queue: String,

    /// Secondary queue that also receives every batch; empty disables it
    #[serde(default)]
    pub cache_queue: String,

    /// Messages per bulk put, which is also the worker batch capacity
    #[serde(default = "default_max_block_count")]
    pub max_block_count: usize,

    /// Retries of the failed subset after a partial send failure
    #[serde(default = "default_send_retries")]
    pub send_retries: u32,
}

impl QueueConfig {
    /// Whether batches are also sent to the secondary queue
    pub fn cache_queue_enabled(&self) -> bool {
        !self.cache_queue.is_empty()
    }
}

fn default_queue_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

const fn default_max_block_count() -> usize {
    10
}

const fn default_send_retries() -> u32 {
    3
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: default_queue_url(),
            out_queue: String::new(),
            cache_queue: String::new(),
            max_block_count: default_max_block_count(),
            send_retries: default_send_retries(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkerConfig {
    /// Number of worker tasks
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the queue between the producer and the workers
    #[serde(default = "default_worker_queue_size")]
    pub worker_queue_size: usize,

    /// Seconds without a new identifier before a partial batch is flushed
    #[serde(default = "default_flush_timeout_secs")]
    pub flush_timeout_secs: u64,

    /// Log worker progress every this many records
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

const fn default_workers() -> usize {
    4
}

const fn default_worker_queue_size() -> usize {
    1000
}

const fn default_flush_timeout_secs() -> u64 {
    5
}

const fn default_progress_interval() -> u64 {
    1000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            worker_queue_size: default_worker_queue_size(),
            flush_timeout_secs: default_flush_timeout_secs(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// Cache store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Cache host name
    #[serde(default = "default_cache_host")]
    pub host: String,

    /// Cache port
    #[serde(default = "default_cache_port")]
    pub port: u16,

    /// Optional password
    #[serde(default)]
    pub password: Option<String>,

    /// Database index
    #[serde(default)]
    pub db: i64,

    /// Connections in the pool; 0 means one per worker
    #[serde(default)]
    pub pool_size: usize,

    /// Connect and response timeout in seconds
    #[serde(default = "default_cache_timeout_secs")]
    pub timeout_secs: u64,

    /// Requests at or above this many milliseconds are logged
    #[serde(default = "default_slow_request_ms")]
    pub slow_request_ms: u64,

    /// Run a bulk existence check before fetching each batch
    #[serde(default)]
    pub verify_exists: bool,
}

impl CacheConfig {
    /// Pool size to use for the given worker count
    pub const fn effective_pool_size(&self, workers: usize) -> usize {
        if self.pool_size == 0 {
            workers
        } else {
            self.pool_size
        }
    }
}

fn default_cache_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_cache_port() -> u16 {
    6379
}

const fn default_cache_timeout_secs() -> u64 {
    5
}

const fn default_slow_request_ms() -> u64 {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: default_cache_host(),
            port: default_cache_port(),
            password: None,
            db: 0,
            pool_size: 0,
            timeout_secs: default_cache_timeout_secs(),
            slow_request_ms: default_slow_request_ms(),
            verify_exists: false,
        }
    }
}

/// Fixed metadata attached to outbound messages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetadataConfig {
    /// Value of the `operation` attribute, e.g. `update` or `delete`
    #[serde(default)]
    pub operation: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation policy: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
