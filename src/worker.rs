//! Chunk worker
//!
//! A worker takes a batch of deliveries, fetches the byte range each one
//! names into an anonymous temporary file, counts words over it and writes
//! a result record to a location derived only from the source key and the
//! range. Redelivered chunks overwrite their own record.
//!
//! Failures are contained per delivery: a malformed message is skipped, a
//! failed fetch, count or upload is reported for redelivery, and neither
//! stops its siblings.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::io::SeekFrom;
use std::sync::Arc;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::chunk::{count_words_in, output_location, ChunkDescriptor, ProcessingResult};
use crate::config::{PipelineConfig, ResultsConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::queue::Delivery;
use crate::storage::ObjectStore;

/// What happened to one delivery
#[derive(Debug)]
pub enum DeliveryOutcome {
    Processed(ProcessingResult),
    /// Not a chunk descriptor; dropped without retry
    Skipped(String),
    Failed(PipelineError),
}

#[derive(Debug)]
pub struct ProcessedDelivery {
    pub delivery: Delivery,
    pub result: ProcessingResult,
}

#[derive(Debug)]
pub struct SkippedDelivery {
    pub delivery: Delivery,
    pub reason: String,
}

#[derive(Debug)]
pub struct FailedDelivery {
    pub delivery: Delivery,
    pub error: PipelineError,
}

impl FailedDelivery {
    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }
}

/// Per-delivery outcomes of one batch
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<ProcessedDelivery>,
    pub skipped: Vec<SkippedDelivery>,
    pub failed: Vec<FailedDelivery>,
}

/// SQS partial batch response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailures {
    pub batch_item_failures: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    pub item_identifier: String,
}

impl BatchReport {
    fn record(&mut self, delivery: Delivery, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Processed(result) => {
                self.processed.push(ProcessedDelivery { delivery, result })
            }
            DeliveryOutcome::Skipped(reason) => {
                self.skipped.push(SkippedDelivery { delivery, reason })
            }
            DeliveryOutcome::Failed(error) => self.failed.push(FailedDelivery { delivery, error }),
        }
    }

    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.failed.len()
    }

    pub fn results(&self) -> impl Iterator<Item = &ProcessingResult> {
        self.processed.iter().map(|p| &p.result)
    }

    /// Message ids the queue should redeliver
    pub fn batch_item_failures(&self) -> BatchItemFailures {
        BatchItemFailures {
            batch_item_failures: self
                .failed
                .iter()
                .filter(|f| f.is_retryable())
                .map(|f| BatchItemFailure {
                    item_identifier: f.delivery.message_id.clone(),
                })
                .collect(),
        }
    }
}

pub struct Worker {
    source: Arc<dyn ObjectStore>,
    results_store: Arc<dyn ObjectStore>,
    results: ResultsConfig,
    concurrency: usize,
    read_buffer_size: usize,
}

impl Worker {
    /// Build a worker reading and writing through the same store
    pub fn new(store: Arc<dyn ObjectStore>, config: &PipelineConfig) -> Self {
        Self::with_results_store(store.clone(), store, config)
    }

    pub fn with_results_store(
        source: Arc<dyn ObjectStore>,
        results_store: Arc<dyn ObjectStore>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            source,
            results_store,
            results: config.results.clone(),
            concurrency: config.worker.concurrency.max(1),
            read_buffer_size: config.worker.read_buffer_size.max(1),
        }
    }

    /// Process a batch with bounded concurrency; returns once every
    /// delivery has an outcome
    pub async fn process_batch(&self, deliveries: Vec<Delivery>) -> BatchReport {
        let size = deliveries.len();
        let outcomes: Vec<(Delivery, DeliveryOutcome)> = stream::iter(deliveries)
            .map(|delivery| async move {
                let outcome = self.process_delivery(&delivery).await;
                (delivery, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (delivery, outcome) in outcomes {
            report.record(delivery, outcome);
        }

        info!(
            batch_size = size,
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Processed batch"
        );
        report
    }

    pub async fn process_delivery(&self, delivery: &Delivery) -> DeliveryOutcome {
        let descriptor = match ChunkDescriptor::from_delivery(delivery) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                let error = PipelineError::MalformedMessage {
                    message_id: delivery.message_id.clone(),
                    reason: e.to_string(),
                };
                warn!(message_id = %delivery.message_id, error = %error, "Skipping message");
                return DeliveryOutcome::Skipped(e.to_string());
            }
        };

        match self.process_chunk(&descriptor).await {
            Ok(result) => DeliveryOutcome::Processed(result),
            Err(error) => {
                warn!(
                    message_id = %delivery.message_id,
                    bucket = %descriptor.bucket,
                    key = %descriptor.key,
                    start = descriptor.chunk.start(),
                    end = descriptor.chunk.end(),
                    receive_count = delivery.receive_count,
                    retryable = error.is_retryable(),
                    error = %error,
                    "Chunk processing failed"
                );
                DeliveryOutcome::Failed(error)
            }
        }
    }

    /// Fetch, count and record one chunk
    pub async fn process_chunk(&self, descriptor: &ChunkDescriptor) -> PipelineResult<ProcessingResult> {
        let ChunkDescriptor {
            bucket, key, chunk, ..
        } = descriptor;
        let processing = |source: std::io::Error| PipelineError::Processing {
            bucket: bucket.clone(),
            key: key.clone(),
            range: *chunk,
            source,
        };

        // Removed by the OS once the handle is dropped, on every path
        let spool = tokio::task::spawn_blocking(tempfile::tempfile)
            .await
            .map_err(std::io::Error::other)
            .and_then(|created| created)
            .map_err(processing)?;
        let mut spool = tokio::fs::File::from_std(spool);

        let fetched = self
            .source
            .read_range(bucket, key, *chunk, &mut spool)
            .await
            .map_err(|source| PipelineError::Fetch {
                bucket: bucket.clone(),
                key: key.clone(),
                range: *chunk,
                source,
            })?;
        spool.flush().await.map_err(processing)?;
        spool.seek(SeekFrom::Start(0)).await.map_err(processing)?;

        let word_count = count_words_in(&mut spool, self.read_buffer_size)
            .await
            .map_err(processing)?;
        debug!(bucket = %bucket, key = %key, range = %chunk, fetched, word_count, "Counted chunk");

        let location = output_location(&self.results.prefix, key, *chunk);
        let output_path = self.results_store.uri(&self.results.bucket, &location);
        let result = ProcessingResult::new(descriptor, word_count, output_path);
        let body = result.to_bytes().map_err(|source| PipelineError::Encode {
            what: "processing result",
            source,
        })?;

        self.results_store
            .put(&self.results.bucket, &location, body)
            .await
            .map_err(|source| PipelineError::Upload {
                location: result.output_path.clone(),
                source,
            })?;

        info!(
            bucket = %bucket,
            key = %key,
            start = chunk.start(),
            end = chunk.end(),
            word_count,
            output = %result.output_path,
            "Wrote chunk result"
        );
        Ok(result)
    }
}
