//! In-memory queue for testing and in-process runs

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::queue::{
    error::{QueueError, QueueResult},
    traits::{ChunkPublisher, DeliverySource},
    types::{Delivery, OutboundMessage},
};

#[derive(Debug, Clone)]
struct QueuedMessage {
    message_id: String,
    message: OutboundMessage,
    receive_count: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<QueuedMessage>,
    inflight: HashMap<String, QueuedMessage>,
    publish_count: usize,
    // Copies of published messages, kept only by `recording` queues
    published: Option<Vec<OutboundMessage>>,
    publish_limit: Option<usize>,
}

/// In-memory queue implementing both publisher and source
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    state: Arc<Mutex<QueueState>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that also keeps a copy of every published message, for
    /// inspection through [`MemoryQueue::published`]
    pub fn recording() -> Self {
        let state = QueueState {
            published: Some(Vec::new()),
            ..QueueState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Reject every publish after the first `limit` succeed
    pub async fn fail_publishes_after(&self, limit: usize) {
        self.state.lock().await.publish_limit = Some(limit);
    }

    /// Every message published so far, in publish order. Empty unless the
    /// queue was created with [`MemoryQueue::recording`].
    pub async fn published(&self) -> Vec<OutboundMessage> {
        self.state.lock().await.published.clone().unwrap_or_default()
    }

    /// Number of successful publishes
    pub async fn publish_count(&self) -> usize {
        self.state.lock().await.publish_count
    }

    /// Messages waiting to be received
    pub async fn ready_len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    /// Messages received but not yet acknowledged or released
    pub async fn inflight_len(&self) -> usize {
        self.state.lock().await.inflight.len()
    }

    /// Queue a copy of an already published message again, as a
    /// duplicate delivery from an at-least-once transport would
    pub async fn redeliver(&self, message: OutboundMessage) {
        let mut state = self.state.lock().await;
        state.ready.push_back(QueuedMessage {
            message_id: Uuid::new_v4().to_string(),
            message,
            receive_count: 0,
        });
    }
}

#[async_trait]
impl ChunkPublisher for MemoryQueue {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn publish(&self, message: OutboundMessage) -> QueueResult<String> {
        let mut state = self.state.lock().await;
        if let Some(limit) = state.publish_limit {
            if state.publish_count >= limit {
                return Err(QueueError::publish(format!(
                    "memory queue rejected publish after {} messages",
                    limit
                )));
            }
        }

        let message_id = Uuid::new_v4().to_string();
        state.publish_count += 1;
        if let Some(published) = state.published.as_mut() {
            published.push(message.clone());
        }
        state.ready.push_back(QueuedMessage {
            message_id: message_id.clone(),
            message,
            receive_count: 0,
        });
        Ok(message_id)
    }
}

#[async_trait]
impl DeliverySource for MemoryQueue {
    async fn receive(&self, max: usize) -> QueueResult<Vec<Delivery>> {
        let mut state = self.state.lock().await;
        let mut deliveries = Vec::new();

        while deliveries.len() < max {
            let Some(mut queued) = state.ready.pop_front() else {
                break;
            };
            queued.receive_count += 1;

            let receipt = Uuid::new_v4().to_string();
            let mut delivery =
                Delivery::from_message(queued.message_id.clone(), queued.message.clone());
            delivery.receipt = Some(receipt.clone());
            delivery.receive_count = queued.receive_count;

            state.inflight.insert(receipt, queued);
            deliveries.push(delivery);
        }

        Ok(deliveries)
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        let receipt = delivery
            .receipt
            .as_deref()
            .ok_or_else(|| QueueError::unknown_receipt("<none>"))?;
        self.state
            .lock()
            .await
            .inflight
            .remove(receipt)
            .map(|_| ())
            .ok_or_else(|| QueueError::unknown_receipt(receipt))
    }

    async fn release(&self, delivery: &Delivery) -> QueueResult<()> {
        let receipt = delivery
            .receipt
            .as_deref()
            .ok_or_else(|| QueueError::unknown_receipt("<none>"))?;
        let mut state = self.state.lock().await;
        let queued = state
            .inflight
            .remove(receipt)
            .ok_or_else(|| QueueError::unknown_receipt(receipt))?;
        state.ready.push_back(queued);
        Ok(())
    }
}
