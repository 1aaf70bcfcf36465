//! Chunk descriptor: the dispatchable unit of work
//!
//! The message body carries `{"bucket", "key", "chunk": {"start", "end"}}`.
//! The ordinal travels out of band as the `ChunkNumber` message attribute.

use serde::{Deserialize, Serialize};

use super::range::ChunkRange;
use crate::queue::{Delivery, OutboundMessage};

/// Message attribute carrying the zero-based chunk ordinal
pub const CHUNK_NUMBER_ATTRIBUTE: &str = "ChunkNumber";

/// One range of one source object, addressed for a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub bucket: String,
    pub key: String,
    pub chunk: ChunkRange,
    /// Position in the partition; informational only
    #[serde(skip)]
    pub ordinal: Option<u64>,
}

impl ChunkDescriptor {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, chunk: ChunkRange) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            chunk,
            ordinal: None,
        }
    }

    pub fn with_ordinal(mut self, ordinal: u64) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Encode as a queue message: JSON body plus the `ChunkNumber` attribute
    pub fn to_message(&self) -> Result<OutboundMessage, serde_json::Error> {
        let body = serde_json::to_string(self)?;
        let mut message = OutboundMessage::new(body);
        if let Some(ordinal) = self.ordinal {
            message = message.with_attribute(CHUNK_NUMBER_ATTRIBUTE, ordinal.to_string());
        }
        Ok(message)
    }

    /// Decode a delivered message. The ordinal is taken from the attribute
    /// when it is present and numeric; a bad attribute is not an error.
    pub fn from_delivery(delivery: &Delivery) -> Result<Self, serde_json::Error> {
        let mut descriptor: ChunkDescriptor = serde_json::from_str(&delivery.body)?;
        descriptor.ordinal = delivery
            .attribute(CHUNK_NUMBER_ATTRIBUTE)
            .and_then(|value| value.trim().parse().ok());
        Ok(descriptor)
    }
}
