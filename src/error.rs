//! Pipeline error type
//!
//! Storage and queue collaborators have their own error enums; this type
//! adds what the partitioner, worker and aggregator were doing when a
//! collaborator failed.

use thiserror::Error;

use crate::chunk::ChunkRange;
use crate::queue::QueueError;
use crate::storage::StorageError;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Size of the source object could not be determined
    #[error("Failed to get object metadata for {bucket}/{key}: {source}")]
    Metadata {
        bucket: String,
        key: String,
        source: StorageError,
    },

    /// A chunk descriptor could not be published; later chunks were not attempted
    #[error(
        "Failed to dispatch chunk {ordinal} of {bucket}/{key} after {dispatched} dispatched: {source}"
    )]
    Dispatch {
        bucket: String,
        key: String,
        ordinal: u64,
        dispatched: u64,
        source: QueueError,
    },

    /// Message body is not a chunk descriptor
    #[error("Malformed message {message_id}: {reason}")]
    MalformedMessage { message_id: String, reason: String },

    /// Range read failed
    #[error("Failed to fetch {range} of {bucket}/{key}: {source}")]
    Fetch {
        bucket: String,
        key: String,
        range: ChunkRange,
        source: StorageError,
    },

    /// Local processing of fetched bytes failed
    #[error("Failed to process {range} of {bucket}/{key}: {source}")]
    Processing {
        bucket: String,
        key: String,
        range: ChunkRange,
        source: std::io::Error,
    },

    /// Result record could not be written
    #[error("Failed to upload result to {location}: {source}")]
    Upload {
        location: String,
        source: StorageError,
    },

    /// A record could not be encoded
    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl PipelineError {
    /// Create a configuration error
    pub fn config<E: std::fmt::Display>(msg: E) -> Self {
        Self::Config(msg.to_string())
    }

    /// Whether retrying the same unit of work could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Metadata { source, .. } => source.is_retryable(),
            Self::Dispatch { .. }
            | Self::Fetch { .. }
            | Self::Processing { .. }
            | Self::Upload { .. } => true,
            Self::Storage(source) => source.is_retryable(),
            Self::Queue(source) => source.is_retryable(),
            Self::MalformedMessage { .. } | Self::Encode { .. } | Self::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_names_ordinal() {
        let err = PipelineError::Dispatch {
            bucket: "input".into(),
            key: "data.txt".into(),
            ordinal: 2,
            dispatched: 2,
            source: QueueError::publish("throttled"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to dispatch chunk 2 of input/data.txt after 2 dispatched: Publish failed: throttled"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retryable_classification() {
        let malformed = PipelineError::MalformedMessage {
            message_id: "m".into(),
            reason: "bad json".into(),
        };
        assert!(!malformed.is_retryable());

        let fetch = PipelineError::Fetch {
            bucket: "b".into(),
            key: "k".into(),
            range: ChunkRange::new(0, 9).unwrap(),
            source: StorageError::connection("reset"),
        };
        assert!(fetch.is_retryable());

        let upload = PipelineError::Upload {
            location: "results/k-0-9.json".into(),
            source: StorageError::backend("503"),
        };
        assert!(upload.is_retryable());
    }
}
