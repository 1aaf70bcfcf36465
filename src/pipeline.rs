//! In-process pipeline driver
//!
//! Wires the partitioner, a consuming queue, the worker and the aggregator
//! together so the whole fan-out/fan-in can run on one machine. Failed
//! deliveries are released for redelivery until they have been received
//! `max_receive_count` times, after which they are dead-lettered. Each
//! delivery is settled on its own: an ack or release that fails is logged
//! and counted, and the delivery stays with the queue for redelivery.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::aggregate::{AggregateReport, Aggregator};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::partitioner::{PartitionReport, Partitioner};
use crate::queue::{ChunkPublisher, Delivery, DeliverySource, QueueFactory};
use crate::storage::{ObjectStore, StorageFactory};
use crate::worker::Worker;

/// A delivery given up on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub message_id: String,
    pub receive_count: u32,
    pub error: String,
}

/// Totals of one drain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub batches: usize,
    pub processed: usize,
    pub skipped: usize,
    /// Deliveries released for another attempt
    pub released: usize,
    pub dead_letters: Vec<DeadLetter>,
    /// Acks or releases the queue rejected
    pub settle_failures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    Ack,
    Release,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub partition: PartitionReport,
    pub drain: DrainReport,
    pub aggregate: AggregateReport,
}

pub struct LocalPipeline {
    partitioner: Partitioner,
    worker: Worker,
    aggregator: Aggregator,
    source: Arc<dyn DeliverySource>,
    batch_size: usize,
    max_receive_count: u32,
}

impl LocalPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        publisher: Arc<dyn ChunkPublisher>,
        source: Arc<dyn DeliverySource>,
        config: &PipelineConfig,
    ) -> PipelineResult<Self> {
        Ok(Self {
            partitioner: Partitioner::new(store.clone(), publisher, config.chunk_size()?),
            worker: Worker::new(store.clone(), config),
            aggregator: Aggregator::new(store, config)?,
            source,
            batch_size: config.worker.batch_size.max(1),
            max_receive_count: config.queue.max_receive_count.max(1),
        })
    }

    /// Build the pipeline from configured storage and queue backends
    pub async fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        let store = StorageFactory::from_config(&config.storage).await?;
        let handles = QueueFactory::from_config(&config.queue).await?;
        let source = handles.source.ok_or_else(|| {
            PipelineError::config(format!(
                "{} queue backend cannot be consumed locally",
                handles.publisher.backend_name()
            ))
        })?;
        Self::new(store, handles.publisher, source, config)
    }

    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Partition, drain and aggregate one object
    pub async fn run(&self, bucket: &str, key: &str) -> PipelineResult<RunReport> {
        let partition = self.partitioner.partition_object(bucket, key).await?;
        let drain = self.drain().await?;
        let aggregate = self.aggregator.aggregate(bucket, key).await?;

        info!(
            bucket,
            key,
            chunks = partition.dispatched,
            word_count = aggregate.word_count,
            complete = aggregate.complete,
            "Pipeline run finished"
        );
        Ok(RunReport {
            partition,
            drain,
            aggregate,
        })
    }

    /// Consume the queue until it is empty
    pub async fn drain(&self) -> PipelineResult<DrainReport> {
        let mut totals = DrainReport::default();

        loop {
            let deliveries = self.source.receive(self.batch_size).await?;
            if deliveries.is_empty() {
                break;
            }
            totals.batches += 1;
            debug!(batch = totals.batches, size = deliveries.len(), "Received batch");

            let report = self.worker.process_batch(deliveries).await;

            for processed in &report.processed {
                self.settle(&processed.delivery, Settlement::Ack, &mut totals).await;
            }
            for skipped in &report.skipped {
                self.settle(&skipped.delivery, Settlement::Ack, &mut totals).await;
            }
            totals.processed += report.processed.len();
            totals.skipped += report.skipped.len();

            for failed in &report.failed {
                let delivery = &failed.delivery;
                if failed.is_retryable() && delivery.receive_count < self.max_receive_count {
                    if self.settle(delivery, Settlement::Release, &mut totals).await {
                        totals.released += 1;
                    }
                    continue;
                }

                error!(
                    message_id = %delivery.message_id,
                    receive_count = delivery.receive_count,
                    error = %failed.error,
                    "Dead-lettering delivery"
                );
                self.settle(delivery, Settlement::Ack, &mut totals).await;
                totals.dead_letters.push(DeadLetter {
                    message_id: delivery.message_id.clone(),
                    receive_count: delivery.receive_count,
                    error: failed.error.to_string(),
                });
            }
        }

        info!(
            batches = totals.batches,
            processed = totals.processed,
            skipped = totals.skipped,
            released = totals.released,
            dead_lettered = totals.dead_letters.len(),
            settle_failures = totals.settle_failures,
            "Queue drained"
        );
        Ok(totals)
    }

    /// Ack or release one delivery, `false` when the queue refused
    async fn settle(
        &self,
        delivery: &Delivery,
        settlement: Settlement,
        totals: &mut DrainReport,
    ) -> bool {
        let result = match settlement {
            Settlement::Ack => self.source.ack(delivery).await,
            Settlement::Release => self.source.release(delivery).await,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    message_id = %delivery.message_id,
                    action = ?settlement,
                    error = %e,
                    "Failed to settle delivery"
                );
                totals.settle_failures += 1;
                false
            }
        }
    }
}
