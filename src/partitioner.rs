//! Partitioner: object-arrival event to chunk descriptors
//!
//! For every object in an event the partitioner looks up the object size,
//! slices it into fixed-size ranges and publishes one descriptor per range.
//! Publishing is sequential so a failure leaves a well-defined prefix of
//! the partition dispatched.

use std::num::NonZeroU64;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::chunk::{partition, ChunkDescriptor};
use crate::error::{PipelineError, PipelineResult};
use crate::events::ObjectArrivalEvent;
use crate::queue::ChunkPublisher;
use crate::storage::ObjectStore;

/// Outcome of partitioning one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionReport {
    pub bucket: String,
    pub key: String,
    pub object_size: u64,
    pub chunk_size: u64,
    /// Number of descriptors published
    pub dispatched: u64,
}

pub struct Partitioner {
    store: Arc<dyn ObjectStore>,
    publisher: Arc<dyn ChunkPublisher>,
    chunk_size: NonZeroU64,
}

impl Partitioner {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        publisher: Arc<dyn ChunkPublisher>,
        chunk_size: NonZeroU64,
    ) -> Self {
        Self {
            store,
            publisher,
            chunk_size,
        }
    }

    pub fn chunk_size(&self) -> NonZeroU64 {
        self.chunk_size
    }

    /// Partition every object named by the event, in order.
    ///
    /// The first fatal error stops the event. Objects already handled stay
    /// dispatched; a retried event re-publishes them, which workers absorb
    /// by overwriting the same result records.
    pub async fn handle_event(
        &self,
        event: &ObjectArrivalEvent,
    ) -> PipelineResult<Vec<PartitionReport>> {
        let mut reports = Vec::with_capacity(event.objects.len());
        for object in &event.objects {
            let report = self
                .partition_object(&object.bucket, &object.key)
                .await
                .inspect_err(|e| {
                    error!(bucket = %object.bucket, key = %object.key, error = %e, "Partitioning failed");
                })?;
            reports.push(report);
        }
        Ok(reports)
    }

    /// Partition one object and publish its descriptors
    pub async fn partition_object(&self, bucket: &str, key: &str) -> PipelineResult<PartitionReport> {
        let meta = self
            .store
            .head(bucket, key)
            .await
            .map_err(|source| PipelineError::Metadata {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            })?;

        let mut dispatched = 0u64;
        for (ordinal, range) in (0u64..).zip(partition(meta.size, self.chunk_size)) {
            let descriptor = ChunkDescriptor::new(bucket, key, range).with_ordinal(ordinal);
            let message = descriptor.to_message().map_err(|source| PipelineError::Encode {
                what: "chunk descriptor",
                source,
            })?;

            let message_id = self.publisher.publish(message).await.map_err(|source| {
                PipelineError::Dispatch {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    ordinal,
                    dispatched,
                    source,
                }
            })?;
            debug!(
                bucket,
                key,
                ordinal,
                start = range.start(),
                end = range.end(),
                message_id = %message_id,
                "Dispatched chunk"
            );
            dispatched += 1;
        }

        info!(
            bucket,
            key,
            object_size = meta.size,
            chunk_size = self.chunk_size.get(),
            chunks = dispatched,
            queue = self.publisher.backend_name(),
            "Partitioned object"
        );

        Ok(PartitionReport {
            bucket: bucket.to_string(),
            key: key.to_string(),
            object_size: meta.size,
            chunk_size: self.chunk_size.get(),
            dispatched,
        })
    }
}
