//! Domain errors for the record relay.

use thiserror::Error;

use super::models::DeliveryOutcome;

/// Errors raised by a cache store.
///
/// Missing entries and missing fields are not errors; they are reported as
/// absent values and filtered by the cache proxy.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache transport error: {0}")]
    Transport(String),

    #[error("Cache request timed out: {0}")]
    Timeout(String),

    #[error("Malformed cache reply: expected {expected} rows, got {actual}")]
    MalformedReply { expected: usize, actual: usize },
}

/// Errors raised by a message queue bulk put.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Some messages were not accepted; the outcome says which.
    #[error("One or more operations were unsuccessful ({} of {} failed)", .0.failed_count(), .0.len())]
    OneOrMoreOperationsUnsuccessful(DeliveryOutcome),

    #[error("Queue transport error: {0}")]
    Transport(String),

    #[error("Malformed send outcome: {actual} statuses for {expected} messages")]
    MalformedOutcome { expected: usize, actual: usize },
}

/// Errors that terminate a worker.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Delivery to queue '{queue}' failed: {source}")]
    Delivery {
        queue: String,
        #[source]
        source: QueueError,
    },

    #[error("Delivery to queue '{queue}' gave up with {failed} messages still failing after {retries} retries")]
    RetriesExhausted {
        queue: String,
        failed: usize,
        retries: u32,
    },

    #[error("Block of {count} messages exceeds the queue limit of {max}")]
    BlockTooLarge { count: usize, max: usize },

    #[error("Worker task aborted: {0}")]
    WorkerAborted(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CacheError::Timeout(err.to_string())
        } else {
            CacheError::Transport(err.to_string())
        }
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        QueueError::Transport(err.to_string())
    }
}
