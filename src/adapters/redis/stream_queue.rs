use ::redis::aio::ConnectionManager;
use ::redis::Value;
use async_trait::async_trait;
use tracing::warn;

use crate::domain::errors::QueueError;
use crate::domain::models::{DeliveryOutcome, OutboundMessage};
use crate::domain::ports::MessageQueue;

use super::connection::pipeline_replies;

/// Stream field holding the message body.
pub const PAYLOAD_FIELD: &str = "payload";

/// Outbound queue writing each message as one Redis stream entry.
///
/// Entry fields are the message attributes in order, followed by `payload`.
#[derive(Clone)]
pub struct RedisStreamQueue {
    conn: ConnectionManager,
    max_block_count: usize,
}

impl RedisStreamQueue {
    /// Connect to the queue transport at `url`.
    pub async fn connect(url: &str, max_block_count: usize) -> Result<Self, QueueError> {
        let client = ::redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            max_block_count,
        })
    }
}

#[async_trait]
impl MessageQueue for RedisStreamQueue {
    fn max_block_count(&self) -> usize {
        self.max_block_count
    }

    async fn batch_put(&self, queue: &str, messages: &[OutboundMessage]) -> Result<(), QueueError> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();

        let mut pipe = ::redis::pipe();
        for message in messages {
            pipe.cmd("XADD").arg(queue).arg("*");
            for attribute in &message.attributes {
                pipe.arg(attribute.name.as_str()).arg(attribute.value.as_str());
            }
            pipe.arg(PAYLOAD_FIELD).arg(message.payload.as_slice());
        }

        let replies = pipeline_replies(&mut conn, &pipe, messages.len()).await?;
        if replies.len() != messages.len() {
            return Err(QueueError::MalformedOutcome {
                expected: messages.len(),
                actual: replies.len(),
            });
        }

        let outcome = outcome_from_replies(queue, &replies);
        if outcome.failed_count() > 0 {
            return Err(QueueError::OneOrMoreOperationsUnsuccessful(outcome));
        }

        Ok(())
    }
}

/// One status per XADD reply; a server error marks that message failed.
fn outcome_from_replies(queue: &str, replies: &[Value]) -> DeliveryOutcome {
    let succeeded = replies
        .iter()
        .enumerate()
        .map(|(index, reply)| match reply {
            Value::ServerError(err) => {
                warn!(queue, index, error = ?err, "queue rejected message");
                false
            }
            _ => true,
        })
        .collect();

    DeliveryOutcome::new(succeeded)
}
