//! Queue abstraction
//!
//! Fan-out goes through a [`ChunkPublisher`]; workers consume from a
//! [`DeliverySource`] or receive batches pushed by an invocation
//! mechanism (see [`SqsEvent`]). Delivery is at least once.

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod traits;
pub mod types;

pub use backends::{MemoryQueue, SpoolQueue};
#[cfg(feature = "sns")]
pub use backends::SnsPublisher;
pub use config::{QueueBackendType, QueueConfig};
pub use error::{QueueError, QueueResult};
pub use factory::{QueueFactory, QueueHandles};
pub use traits::{ChunkPublisher, DeliverySource};
pub use types::{Delivery, OutboundMessage, SqsEvent, SqsRecord};
