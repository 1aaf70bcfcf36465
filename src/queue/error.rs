//! Error types for the queue layer

use std::fmt;
use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Queue error types
#[derive(Error, Debug)]
pub enum QueueError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Publishing a message failed
    #[error("Publish failed: {0}")]
    Publish(String),

    /// Unknown or already settled receipt
    #[error("Unknown receipt: {0}")]
    UnknownReceipt(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl QueueError {
    /// Create a serialization error
    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Create a publish error
    pub fn publish<E: fmt::Display>(msg: E) -> Self {
        Self::Publish(msg.to_string())
    }

    /// Create an unknown receipt error
    pub fn unknown_receipt<E: fmt::Display>(receipt: E) -> Self {
        Self::UnknownReceipt(receipt.to_string())
    }

    /// Create a configuration error
    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Publish(_))
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}
