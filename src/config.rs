//! Pipeline configuration
//!
//! Loaded once per process from an optional TOML file, then overridden by
//! `CHUNKFAN_*` environment variables, then validated. The resulting value
//! is shared read-only by every component.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::path::Path;

use crate::chunk::{DEFAULT_CHUNK_SIZE, DEFAULT_RESULTS_PREFIX};
use crate::error::{PipelineError, PipelineResult};
use crate::queue::{QueueBackendType, QueueConfig};
use crate::storage::{BackendType, StorageConfig};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    #[serde(default)]
    pub results: ResultsConfig,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub queue: QueueConfig,
}

/// Where result records are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    /// Results bucket
    #[serde(default = "default_results_bucket")]
    pub bucket: String,

    /// Key prefix inside the results bucket
    #[serde(default = "default_results_prefix")]
    pub prefix: String,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            bucket: default_results_bucket(),
            prefix: default_results_prefix(),
        }
    }
}

/// Worker tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Deliveries of one batch processed concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Read buffer used while counting words
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,

    /// Deliveries pulled per receive when draining a queue
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            read_buffer_size: default_read_buffer_size(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            results: ResultsConfig::default(),
            worker: WorkerConfig::default(),
            storage: StorageConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_results_bucket() -> String {
    "results".to_string()
}

fn default_results_prefix() -> String {
    DEFAULT_RESULTS_PREFIX.to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_read_buffer_size() -> usize {
    64 * 1024
}

fn default_batch_size() -> usize {
    10
}

impl PipelineConfig {
    /// Load from an optional TOML file, apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> PipelineResult<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| PipelineError::config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> PipelineResult<Self> {
        toml::from_str(content).map_err(PipelineError::config)
    }

    /// Apply `CHUNKFAN_*` overrides read through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("CHUNKFAN_CHUNK_SIZE") {
            self.chunk_size = parse_number("CHUNKFAN_CHUNK_SIZE", &value)?;
        }
        if let Some(bucket) = lookup("CHUNKFAN_OUTPUT_BUCKET").or_else(|| lookup("OUTPUT_BUCKET")) {
            self.results.bucket = bucket;
        }
        if let Some(prefix) = lookup("CHUNKFAN_RESULTS_PREFIX") {
            self.results.prefix = prefix;
        }
        if let Some(value) = lookup("CHUNKFAN_WORKER_CONCURRENCY") {
            self.worker.concurrency = parse_number("CHUNKFAN_WORKER_CONCURRENCY", &value)?;
        }
        if let Some(value) = lookup("CHUNKFAN_STORAGE_TYPE") {
            self.storage.backend = BackendType::parse(&value).ok_or_else(|| {
                PipelineError::config(format!("Unknown storage type: {}", value))
            })?;
        }
        if let Some(dir) = lookup("CHUNKFAN_STORAGE_DIR") {
            self.storage.base_dir = dir.into();
        }
        if let Some(endpoint) = lookup("CHUNKFAN_S3_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Some(value) = lookup("CHUNKFAN_QUEUE_TYPE") {
            self.queue.backend = QueueBackendType::parse(&value)
                .ok_or_else(|| PipelineError::config(format!("Unknown queue type: {}", value)))?;
        }
        if let Some(dir) = lookup("CHUNKFAN_SPOOL_DIR") {
            self.queue.spool_dir = dir.into();
        }
        if let Some(topic) = lookup("CHUNKFAN_TOPIC") {
            self.queue.topic = Some(topic);
        }
        if let Some(value) = lookup("CHUNKFAN_MAX_RECEIVE_COUNT") {
            self.queue.max_receive_count = parse_number("CHUNKFAN_MAX_RECEIVE_COUNT", &value)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.chunk_size == 0 {
            return Err(PipelineError::config("chunk_size must be greater than zero"));
        }
        if self.results.bucket.trim().is_empty() {
            return Err(PipelineError::config("results bucket must not be empty"));
        }
        if self.worker.concurrency == 0 {
            return Err(PipelineError::config("worker concurrency must be at least 1"));
        }
        if self.worker.batch_size == 0 {
            return Err(PipelineError::config("worker batch size must be at least 1"));
        }
        if self.queue.max_receive_count == 0 {
            return Err(PipelineError::config("max_receive_count must be at least 1"));
        }
        if self.queue.visibility_timeout.is_zero() {
            return Err(PipelineError::config("visibility_timeout must be greater than zero"));
        }
        if self.queue.backend == QueueBackendType::Sns && self.queue.topic.is_none() {
            return Err(PipelineError::config("sns queue requires a topic"));
        }
        Ok(())
    }

    /// Chunk size as a non-zero value
    pub fn chunk_size(&self) -> PipelineResult<NonZeroU64> {
        NonZeroU64::new(self.chunk_size)
            .ok_or_else(|| PipelineError::config("chunk_size must be greater than zero"))
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> PipelineResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PipelineError::config(format!("{} must be a number, got {:?}", name, value)))
}
