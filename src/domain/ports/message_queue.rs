use async_trait::async_trait;

use crate::domain::errors::QueueError;
use crate::domain::models::OutboundMessage;

/// Port for the outbound message transport.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Largest number of messages accepted by one `batch_put` call.
    fn max_block_count(&self) -> usize;

    /// Put `messages` on `queue` in one bulk call.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every message was accepted
    /// * `Err(QueueError::OneOrMoreOperationsUnsuccessful)` - Some messages were
    ///   rejected; the outcome holds one status per message in input order
    /// * `Err(_)` - Any other failure; nothing can be assumed about delivery
    async fn batch_put(&self, queue: &str, messages: &[OutboundMessage]) -> Result<(), QueueError>;
}
