//! In-memory message queue with scripted bulk put results.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::domain::errors::QueueError;
use crate::domain::models::{DeliveryOutcome, OutboundMessage};
use crate::domain::ports::MessageQueue;

/// Scripted result of one `batch_put` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutScript {
    /// Accept every message
    Accept,
    /// Reject the messages at these positions, accept the rest
    Reject(Vec<usize>),
    /// Fail the whole call with a transport error
    Fail(String),
}

/// One recorded `batch_put` call.
#[derive(Debug, Clone)]
pub struct PutCall {
    /// Target queue
    pub queue: String,
    /// Messages handed to the call
    pub messages: Vec<OutboundMessage>,
}

impl PutCall {
    /// Record identifiers of the messages in the call, in order.
    pub fn record_ids(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter_map(|m| m.record_id().map(ToString::to_string))
            .collect()
    }
}

#[derive(Default)]
struct QueueState {
    scripts: HashMap<String, VecDeque<PutScript>>,
    calls: Vec<PutCall>,
    delivered: HashMap<String, Vec<OutboundMessage>>,
}

/// Queue that records every call and accepts unless scripted otherwise.
pub struct InMemoryQueue {
    max_block_count: usize,
    state: Mutex<QueueState>,
}

impl InMemoryQueue {
    /// Create a queue accepting up to `max_block_count` messages per call.
    pub fn new(max_block_count: usize) -> Self {
        Self {
            max_block_count,
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Queue a scripted result for the next unscripted call on `queue`.
    pub fn script(&self, queue: &str, script: PutScript) {
        self.lock()
            .scripts
            .entry(queue.to_string())
            .or_default()
            .push_back(script);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<PutCall> {
        self.lock().calls.clone()
    }

    /// Calls made against `queue`, in order.
    pub fn calls_for(&self, queue: &str) -> Vec<PutCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.queue == queue)
            .cloned()
            .collect()
    }

    /// Messages accepted by `queue`, in acceptance order.
    pub fn delivered(&self, queue: &str) -> Vec<OutboundMessage> {
        self.lock().delivered.get(queue).cloned().unwrap_or_default()
    }

    /// Record identifiers accepted by `queue`, in acceptance order.
    pub fn delivered_ids(&self, queue: &str) -> Vec<String> {
        self.delivered(queue)
            .iter()
            .filter_map(|m| m.record_id().map(ToString::to_string))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().expect("queue state lock poisoned")
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    fn max_block_count(&self) -> usize {
        self.max_block_count
    }

    async fn batch_put(&self, queue: &str, messages: &[OutboundMessage]) -> Result<(), QueueError> {
        let mut state = self.lock();
        state.calls.push(PutCall {
            queue: queue.to_string(),
            messages: messages.to_vec(),
        });

        let script = state
            .scripts
            .get_mut(queue)
            .and_then(VecDeque::pop_front)
            .unwrap_or(PutScript::Accept);

        match script {
            PutScript::Accept => {
                state
                    .delivered
                    .entry(queue.to_string())
                    .or_default()
                    .extend_from_slice(messages);
                Ok(())
            }
            PutScript::Reject(failed) => {
                let succeeded: Vec<bool> = (0..messages.len()).map(|ix| !failed.contains(&ix)).collect();
                let accepted = messages
                    .iter()
                    .zip(&succeeded)
                    .filter(|(_, ok)| **ok)
                    .map(|(m, _)| m.clone());
                state
                    .delivered
                    .entry(queue.to_string())
                    .or_default()
                    .extend(accepted);
                Err(QueueError::OneOrMoreOperationsUnsuccessful(DeliveryOutcome::new(succeeded)))
            }
            PutScript::Fail(message) => Err(QueueError::Transport(message)),
        }
    }
}
