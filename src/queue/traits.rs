//! Queue collaborator traits

use async_trait::async_trait;

use super::error::QueueResult;
use super::types::{Delivery, OutboundMessage};

/// Publishing side of the queue (fan-out)
#[async_trait]
pub trait ChunkPublisher: Send + Sync {
    /// Short backend name used in logs
    fn backend_name(&self) -> &'static str;

    /// Publish one message, returning the id the backend assigned to it
    async fn publish(&self, message: OutboundMessage) -> QueueResult<String>;
}

/// Consuming side of the queue, with at-least-once semantics:
/// a received delivery that is neither acknowledged nor released is never
/// lost, and a released delivery is handed out again.
#[async_trait]
pub trait DeliverySource: Send + Sync {
    /// Take up to `max` deliveries; empty when the queue is drained
    async fn receive(&self, max: usize) -> QueueResult<Vec<Delivery>>;

    /// Remove a delivery permanently
    async fn ack(&self, delivery: &Delivery) -> QueueResult<()>;

    /// Return a delivery to the queue for redelivery
    async fn release(&self, delivery: &Delivery) -> QueueResult<()>;
}
