//! Fan-in: combine per-chunk results into a per-object total
//!
//! The expected chunk set is recomputed from the source object's size and
//! the configured chunk size, so no manifest is needed to notice chunks that
//! were never dispatched or never processed. The results prefix of the
//! object is listed once; only listed records are fetched, and listed
//! records outside the current partition are reported as stray.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::num::NonZeroU64;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chunk::{
    chunk_count, output_location, parse_record_range, partition, records_prefix,
    summary_location, ChunkRange, ProcessingResult,
};
use crate::config::{PipelineConfig, ResultsConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::storage::ObjectStore;

/// Coverage and total of one source object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub bucket: String,
    pub key: String,
    pub object_size: u64,
    pub chunk_size: u64,
    pub expected_chunks: u64,
    pub completed_chunks: u64,
    /// Ranges without a usable result record, in offset order
    pub missing: Vec<ChunkRange>,
    /// Sum over completed chunks
    pub word_count: u64,
    pub complete: bool,
    /// Records of this object whose range is not part of the current
    /// partition, e.g. left over from a different chunk size
    #[serde(default)]
    pub stray: Vec<ChunkRange>,
}

pub struct Aggregator {
    source: Arc<dyn ObjectStore>,
    results_store: Arc<dyn ObjectStore>,
    results: ResultsConfig,
    chunk_size: NonZeroU64,
    concurrency: usize,
}

impl Aggregator {
    pub fn new(store: Arc<dyn ObjectStore>, config: &PipelineConfig) -> PipelineResult<Self> {
        Self::with_results_store(store.clone(), store, config)
    }

    pub fn with_results_store(
        source: Arc<dyn ObjectStore>,
        results_store: Arc<dyn ObjectStore>,
        config: &PipelineConfig,
    ) -> PipelineResult<Self> {
        Ok(Self {
            source,
            results_store,
            results: config.results.clone(),
            chunk_size: config.chunk_size()?,
            concurrency: config.worker.concurrency.max(1),
        })
    }

    /// Check every expected chunk of `bucket/key` and write the summary
    /// record when all of them are present
    pub async fn aggregate(&self, bucket: &str, key: &str) -> PipelineResult<AggregateReport> {
        let meta = self
            .source
            .head(bucket, key)
            .await
            .map_err(|source| PipelineError::Metadata {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            })?;

        let prefix = records_prefix(&self.results.prefix, key);
        let mut recorded: BTreeSet<ChunkRange> = self
            .results_store
            .list(&self.results.bucket, &prefix)
            .await?
            .iter()
            .filter_map(|location| parse_record_range(&prefix, location))
            .collect();

        let expected: Vec<ChunkRange> = partition(meta.size, self.chunk_size).collect();
        let lookups: Vec<(ChunkRange, PipelineResult<Option<u64>>)> = stream::iter(&expected)
            .map(|&range| {
                let listed = recorded.contains(&range);
                async move {
                    if !listed {
                        return (range, Ok(None));
                    }
                    (range, self.chunk_word_count(bucket, key, range).await)
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        for range in &expected {
            recorded.remove(range);
        }
        let stray: Vec<ChunkRange> = recorded.into_iter().collect();
        if !stray.is_empty() {
            warn!(bucket, key, stray = stray.len(), "Result records outside the current partition");
        }

        let mut missing = Vec::new();
        let mut word_count = 0u64;
        for (range, lookup) in lookups {
            match lookup? {
                Some(count) => word_count = word_count.saturating_add(count),
                None => missing.push(range),
            }
        }

        let expected_chunks = chunk_count(meta.size, self.chunk_size);
        let report = AggregateReport {
            bucket: bucket.to_string(),
            key: key.to_string(),
            object_size: meta.size,
            chunk_size: self.chunk_size.get(),
            expected_chunks,
            completed_chunks: expected_chunks - missing.len() as u64,
            complete: missing.is_empty(),
            missing,
            word_count,
            stray,
        };

        if report.complete {
            let location = summary_location(&self.results.prefix, key);
            let body = serde_json::to_vec(&report).map_err(|source| PipelineError::Encode {
                what: "aggregate summary",
                source,
            })?;
            self.results_store
                .put(&self.results.bucket, &location, body)
                .await
                .map_err(|source| PipelineError::Upload {
                    location: self.results_store.uri(&self.results.bucket, &location),
                    source,
                })?;
            info!(bucket, key, word_count = report.word_count, chunks = expected_chunks, "Aggregated object");
        } else {
            warn!(
                bucket,
                key,
                expected = report.expected_chunks,
                completed = report.completed_chunks,
                "Object results incomplete"
            );
        }

        Ok(report)
    }

    /// Word count recorded for one range, `None` when the record is absent
    /// or does not describe this range
    async fn chunk_word_count(
        &self,
        bucket: &str,
        key: &str,
        range: ChunkRange,
    ) -> PipelineResult<Option<u64>> {
        let location = output_location(&self.results.prefix, key, range);
        let Some(body) = self.results_store.get(&self.results.bucket, &location).await? else {
            return Ok(None);
        };

        match serde_json::from_slice::<ProcessingResult>(&body) {
            Ok(result) if result.bucket == bucket && result.key == key && result.chunk == range => {
                Ok(Some(result.word_count))
            }
            Ok(_) => {
                warn!(location = %location, "Result record describes a different chunk");
                Ok(None)
            }
            Err(e) => {
                debug!(location = %location, error = %e, "Unreadable result record");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkDescriptor;
    use crate::storage::MemoryBackend;

    fn config() -> PipelineConfig {
        PipelineConfig {
            chunk_size: 10,
            ..Default::default()
        }
    }

    async fn record(store: &MemoryBackend, start: u64, end: u64, words: u64) {
        let range = ChunkRange::new(start, end).unwrap();
        let location = output_location("results", "data.txt", range);
        let result = ProcessingResult::new(
            &ChunkDescriptor::new("input", "data.txt", range),
            words,
            store.uri("results", &location),
        );
        store
            .put("results", &location, result.to_bytes().unwrap())
            .await
            .unwrap();
    }

    async fn store_of(size: usize) -> MemoryBackend {
        let store = MemoryBackend::new();
        store.put("input", "data.txt", vec![b'x'; size]).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_complete_object_writes_summary() {
        let store = store_of(25).await;
        record(&store, 0, 9, 2).await;
        record(&store, 10, 19, 3).await;
        record(&store, 20, 24, 1).await;

        let aggregator = Aggregator::new(Arc::new(store.clone()), &config()).unwrap();
        let report = aggregator.aggregate("input", "data.txt").await.unwrap();

        assert!(report.complete);
        assert_eq!(report.expected_chunks, 3);
        assert_eq!(report.word_count, 6);

        let summary = store
            .get("results", "results/data.txt-total.json")
            .await
            .unwrap()
            .unwrap();
        let summary: AggregateReport = serde_json::from_slice(&summary).unwrap();
        assert_eq!(summary, report);
    }

    #[tokio::test]
    async fn test_missing_chunk_is_reported_without_summary() {
        let store = store_of(25).await;
        record(&store, 0, 9, 2).await;
        record(&store, 20, 24, 1).await;

        let aggregator = Aggregator::new(Arc::new(store.clone()), &config()).unwrap();
        let report = aggregator.aggregate("input", "data.txt").await.unwrap();

        assert!(!report.complete);
        assert_eq!(report.completed_chunks, 2);
        assert_eq!(report.missing, vec![ChunkRange::new(10, 19).unwrap()]);
        assert!(store
            .get("results", "results/data.txt-total.json")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_counts_as_missing() {
        let store = store_of(10).await;
        store
            .put("results", "results/data.txt-0-9.json", b"garbage".to_vec())
            .await
            .unwrap();

        let aggregator = Aggregator::new(Arc::new(store), &config()).unwrap();
        let report = aggregator.aggregate("input", "data.txt").await.unwrap();
        assert_eq!(report.missing.len(), 1);
    }

    #[tokio::test]
    async fn test_records_outside_partition_are_stray() {
        let store = store_of(25).await;
        record(&store, 0, 9, 2).await;
        record(&store, 10, 19, 3).await;
        record(&store, 20, 24, 1).await;
        // Left over from an earlier run at chunk size 5
        record(&store, 0, 4, 1).await;

        let aggregator = Aggregator::new(Arc::new(store), &config()).unwrap();
        let report = aggregator.aggregate("input", "data.txt").await.unwrap();

        assert!(report.complete);
        assert_eq!(report.word_count, 6);
        assert_eq!(report.stray, vec![ChunkRange::new(0, 4).unwrap()]);
    }

    #[tokio::test]
    async fn test_records_of_similarly_named_key_are_ignored() {
        let store = store_of(10).await;
        record(&store, 0, 9, 2).await;
        store
            .put("results", "results/data.txt-old-0-9.json", b"{}".to_vec())
            .await
            .unwrap();

        let aggregator = Aggregator::new(Arc::new(store), &config()).unwrap();
        let report = aggregator.aggregate("input", "data.txt").await.unwrap();
        assert!(report.complete);
        assert!(report.stray.is_empty());
    }

    #[tokio::test]
    async fn test_empty_object_is_trivially_complete() {
        let store = store_of(0).await;
        let aggregator = Aggregator::new(Arc::new(store), &config()).unwrap();
        let report = aggregator.aggregate("input", "data.txt").await.unwrap();
        assert!(report.complete);
        assert_eq!(report.expected_chunks, 0);
        assert_eq!(report.word_count, 0);
    }
}
