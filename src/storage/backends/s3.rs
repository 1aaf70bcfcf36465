//! S3 storage backend implementation

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::chunk::ChunkRange;
use crate::storage::{
    config::StorageConfig,
    error::{StorageError, StorageResult},
    traits::{ObjectStore, RangeSink},
    types::ObjectMeta,
};

/// S3 storage backend
pub struct S3Backend {
    client: Arc<Client>,
}

impl S3Backend {
    /// Create new S3 backend
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        info!("Initializing S3 backend");

        let timeouts = aws_config::timeout::TimeoutConfig::builder()
            .operation_timeout(config.timeout)
            .build();
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .timeout_config(timeouts);
        if let Some(ref region) = config.region {
            loader = loader.region(aws_sdk_s3::config::Region::new(region.clone()));
        }
        if let Some(ref endpoint) = config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        // Custom endpoints (MinIO, LocalStack) generally need path-style addressing
        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        Ok(Self {
            client: Arc::new(Client::from_conf(s3_config)),
        })
    }

    /// Wrap an existing client
    pub fn from_client(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    fn uri(&self, bucket: &str, key: &str) -> String {
        format!("s3://{}/{}", bucket, key)
    }

    async fn head(&self, bucket: &str, key: &str) -> StorageResult<ObjectMeta> {
        debug!(bucket, key, "Fetching object metadata");

        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    StorageError::not_found(format!("s3://{}/{}", bucket, key))
                } else {
                    StorageError::backend(format!("Failed to get object metadata: {}", service_error))
                }
            })?;

        let length = output
            .content_length()
            .ok_or_else(|| StorageError::backend("HEAD response has no content length"))?;
        let size = u64::try_from(length)
            .map_err(|_| StorageError::backend(format!("Negative content length: {}", length)))?;
        let last_modified = output
            .last_modified()
            .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()));

        Ok(ObjectMeta {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size,
            last_modified,
        })
    }

    async fn read_range(
        &self,
        bucket: &str,
        key: &str,
        range: ChunkRange,
        sink: &mut RangeSink<'_>,
    ) -> StorageResult<u64> {
        debug!(bucket, key, range = %range, "Fetching object range");

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .range(range.http_range())
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::not_found(format!("s3://{}/{}", bucket, key))
                } else {
                    StorageError::backend(format!("Failed to fetch range: {}", service_error))
                }
            })?;

        let mut body = output.body;
        let mut copied = 0u64;
        while let Some(bytes) = body
            .try_next()
            .await
            .map_err(|e| StorageError::backend(format!("Failed to read range body: {}", e)))?
        {
            sink.write_all(&bytes).await?;
            copied += bytes.len() as u64;
        }
        sink.flush().await?;
        Ok(copied)
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        debug!(bucket, key, "Loading object");

        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(StorageError::backend(format!(
                    "Failed to load object: {}",
                    service_error
                )));
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::backend(format!("Failed to read object: {}", e)))?
            .into_bytes();
        Ok(Some(bytes.to_vec()))
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        debug!(bucket, key, bytes = body.len(), "Saving object");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                StorageError::backend(format!("Failed to save object: {}", e.into_service_error()))
            })?;

        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        debug!(bucket, prefix, "Listing objects");

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                StorageError::backend(format!("Failed to list objects: {}", e.into_service_error()))
            })?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );
        }
        keys.sort();
        Ok(keys)
    }
}
