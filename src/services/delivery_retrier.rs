//! Bulk delivery with retry of the failed subset.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::{PipelineError, PipelineResult, QueueError};
use crate::domain::models::{DeliveryOutcome, OutboundMessage};
use crate::domain::ports::MessageQueue;

/// Default number of retries after a partial send failure.
pub const DEFAULT_SEND_RETRIES: u32 = 3;

/// Sends blocks of messages, retrying only the ones the queue rejected.
///
/// # Retry Decision
/// - Retry on: `QueueError::OneOrMoreOperationsUnsuccessful`, only the failed messages
/// - Do NOT retry: any other queue error
#[derive(Clone)]
pub struct DeliveryRetrier {
    queue: Arc<dyn MessageQueue>,
    send_retries: u32,
}

impl DeliveryRetrier {
    /// Create a retrier over `queue` allowing `send_retries` retries.
    pub fn new(queue: Arc<dyn MessageQueue>, send_retries: u32) -> Self {
        Self {
            queue,
            send_retries,
        }
    }

    /// Maximum messages per send.
    pub fn max_block_count(&self) -> usize {
        self.queue.max_block_count()
    }

    /// Deliver `messages` to `queue_name`.
    ///
    /// # Returns
    /// * `Ok(())` - Every message was accepted, possibly after retries
    /// * `Err(PipelineError::RetriesExhausted)` - Messages were still rejected after the last retry
    /// * `Err(PipelineError::Delivery)` - The queue failed with a non-retryable error
    pub async fn send(&self, queue_name: &str, messages: &[OutboundMessage]) -> PipelineResult<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let max = self.queue.max_block_count();
        if messages.len() > max {
            return Err(PipelineError::BlockTooLarge {
                count: messages.len(),
                max,
            });
        }

        match self.queue.batch_put(queue_name, messages).await {
            Ok(()) => Ok(()),
            Err(QueueError::OneOrMoreOperationsUnsuccessful(outcome)) => {
                warn!(
                    queue = queue_name,
                    failed = outcome.failed_count(),
                    total = messages.len(),
                    "one or more items failed to send, retrying"
                );
                self.retry_failed(queue_name, messages, &outcome).await
            }
            Err(source) => Err(delivery_error(queue_name, source)),
        }
    }

    async fn retry_failed(
        &self,
        queue_name: &str,
        messages: &[OutboundMessage],
        outcome: &DeliveryOutcome,
    ) -> PipelineResult<()> {
        let mut pending = select_failed(queue_name, messages, outcome)?;

        for attempt in 1..=self.send_retries {
            if pending.is_empty() {
                return Ok(());
            }

            debug!(queue = queue_name, attempt, count = pending.len(), "retrying failed messages");

            match self.queue.batch_put(queue_name, &pending).await {
                Ok(()) => return Ok(()),
                Err(QueueError::OneOrMoreOperationsUnsuccessful(outcome)) => {
                    warn!(
                        queue = queue_name,
                        attempt,
                        failed = outcome.failed_count(),
                        "retry left messages undelivered"
                    );
                    pending = select_failed(queue_name, &pending, &outcome)?;
                }
                Err(source) => return Err(delivery_error(queue_name, source)),
            }
        }

        if pending.is_empty() {
            return Ok(());
        }

        Err(PipelineError::RetriesExhausted {
            queue: queue_name.to_string(),
            failed: pending.len(),
            retries: self.send_retries,
        })
    }
}

/// Pick the messages an outcome marks as failed.
fn select_failed(
    queue_name: &str,
    sent: &[OutboundMessage],
    outcome: &DeliveryOutcome,
) -> PipelineResult<Vec<OutboundMessage>> {
    if outcome.len() != sent.len() {
        return Err(delivery_error(
            queue_name,
            QueueError::MalformedOutcome {
                expected: sent.len(),
                actual: outcome.len(),
            },
        ));
    }

    Ok(outcome
        .failed_indices()
        .into_iter()
        .map(|ix| sent[ix].clone())
        .collect())
}

fn delivery_error(queue_name: &str, source: QueueError) -> PipelineError {
    PipelineError::Delivery {
        queue: queue_name.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryQueue, PutScript};
    use crate::domain::models::{CacheEntry, Identifier};

    fn messages(count: usize) -> Vec<OutboundMessage> {
        (0..count)
            .map(|i| {
                OutboundMessage::from_entry(
                    &Identifier::new(format!("id-{i}")),
                    CacheEntry {
                        record_type: "xml".to_string(),
                        source: "test".to_string(),
                        payload: format!("<doc>{i}</doc>").into_bytes(),
                    },
                    None,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_send_succeeds_first_time() {
        let queue = Arc::new(InMemoryQueue::new(10));
        let retrier = DeliveryRetrier::new(queue.clone(), 3);

        retrier.send("out", &messages(5)).await.unwrap();

        assert_eq!(queue.calls_for("out").len(), 1);
        assert_eq!(queue.delivered_ids("out").len(), 5);
    }

    #[tokio::test]
    async fn test_retry_sends_only_failed_messages() {
        let queue = Arc::new(InMemoryQueue::new(10));
        queue.script("out", PutScript::Reject(vec![2, 5]));
        let retrier = DeliveryRetrier::new(queue.clone(), 3);

        retrier.send("out", &messages(8)).await.unwrap();

        let calls = queue.calls_for("out");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].record_ids().len(), 8);
        assert_eq!(calls[1].record_ids(), vec!["id-2", "id-5"]);

        let mut delivered = queue.delivered_ids("out");
        delivered.sort();
        assert_eq!(delivered.len(), 8);
    }

    #[tokio::test]
    async fn test_retry_narrows_subset_each_attempt() {
        let queue = Arc::new(InMemoryQueue::new(10));
        queue.script("out", PutScript::Reject(vec![1, 3, 4]));
        // second attempt sees [id-1, id-3, id-4]; index 2 is id-4
        queue.script("out", PutScript::Reject(vec![2]));
        let retrier = DeliveryRetrier::new(queue.clone(), 3);

        retrier.send("out", &messages(6)).await.unwrap();

        let calls = queue.calls_for("out");
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].record_ids(), vec!["id-1", "id-3", "id-4"]);
        assert_eq!(calls[2].record_ids(), vec!["id-4"]);
    }

    #[tokio::test]
    async fn test_retries_exhausted_is_fatal() {
        let queue = Arc::new(InMemoryQueue::new(10));
        for _ in 0..4 {
            queue.script("out", PutScript::Reject(vec![0]));
        }
        let retrier = DeliveryRetrier::new(queue.clone(), 3);

        let err = retrier.send("out", &messages(3)).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::RetriesExhausted { failed: 1, retries: 3, .. }
        ));
        // initial send + 3 retries
        assert_eq!(queue.calls_for("out").len(), 4);
    }

    #[tokio::test]
    async fn test_zero_retries_fails_on_partial_failure() {
        let queue = Arc::new(InMemoryQueue::new(10));
        queue.script("out", PutScript::Reject(vec![1]));
        let retrier = DeliveryRetrier::new(queue.clone(), 0);

        let err = retrier.send("out", &messages(2)).await.unwrap_err();
        assert!(matches!(err, PipelineError::RetriesExhausted { retries: 0, .. }));
        assert_eq!(queue.calls_for("out").len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let queue = Arc::new(InMemoryQueue::new(10));
        queue.script("out", PutScript::Fail("access denied".to_string()));
        let retrier = DeliveryRetrier::new(queue.clone(), 3);

        let err = retrier.send("out", &messages(4)).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Delivery { source: QueueError::Transport(_), .. }
        ));
        assert_eq!(queue.calls_for("out").len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_during_retry_is_fatal() {
        let queue = Arc::new(InMemoryQueue::new(10));
        queue.script("out", PutScript::Reject(vec![0]));
        queue.script("out", PutScript::Fail("connection closed".to_string()));
        let retrier = DeliveryRetrier::new(queue.clone(), 3);

        let err = retrier.send("out", &messages(2)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Delivery { .. }));
        assert_eq!(queue.calls_for("out").len(), 2);
    }

    #[tokio::test]
    async fn test_block_too_large() {
        let queue = Arc::new(InMemoryQueue::new(2));
        let retrier = DeliveryRetrier::new(queue.clone(), 3);

        let err = retrier.send("out", &messages(3)).await.unwrap_err();
        assert!(matches!(err, PipelineError::BlockTooLarge { count: 3, max: 2 }));
        assert!(queue.calls_for("out").is_empty());
    }

    #[tokio::test]
    async fn test_empty_block_is_noop() {
        let queue = Arc::new(InMemoryQueue::new(10));
        let retrier = DeliveryRetrier::new(queue.clone(), 3);

        retrier.send("out", &[]).await.unwrap();
        assert!(queue.calls_for("out").is_empty());
    }

    #[test]
    fn test_select_failed_rejects_mismatched_outcome() {
        let sent = messages(3);
        let outcome = DeliveryOutcome::new(vec![true, false]);

        let err = select_failed("out", &sent, &outcome).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Delivery {
                source: QueueError::MalformedOutcome { expected: 3, actual: 2 },
                ..
            }
        ));
    }
}
