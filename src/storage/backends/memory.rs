//! In-memory object store for testing and in-process runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::chunk::ChunkRange;
use crate::storage::{
    error::{StorageError, StorageResult},
    traits::{ObjectStore, RangeSink},
    types::{satisfiable_range, ObjectMeta},
};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Arc<Vec<u8>>,
    last_modified: DateTime<Utc>,
}

/// In-memory object store
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    objects: Arc<RwLock<BTreeMap<(String, String), StoredObject>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all buckets
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn uri(&self, bucket: &str, key: &str) -> String {
        format!("memory://{}/{}", bucket, key)
    }

    async fn head(&self, bucket: &str, key: &str) -> StorageResult<ObjectMeta> {
        let objects = self.objects.read().await;
        let object = objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| StorageError::not_found(format!("{}/{}", bucket, key)))?;

        Ok(ObjectMeta {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: object.body.len() as u64,
            last_modified: Some(object.last_modified),
        })
    }

    async fn read_range(
        &self,
        bucket: &str,
        key: &str,
        range: ChunkRange,
        sink: &mut RangeSink<'_>,
    ) -> StorageResult<u64> {
        // Clone the Arc so the lock is not held across the write
        let body = {
            let objects = self.objects.read().await;
            objects
                .get(&(bucket.to_string(), key.to_string()))
                .map(|object| Arc::clone(&object.body))
                .ok_or_else(|| StorageError::not_found(format!("{}/{}", bucket, key)))?
        };

        let (start, end) = satisfiable_range(range, body.len() as u64)?;
        let slice = &body[start as usize..=end as usize];
        sink.write_all(slice).await?;
        sink.flush().await?;
        Ok(slice.len() as u64)
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.body.as_ref().clone()))
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        self.objects.write().await.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: Arc::new(body),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with(body: &[u8]) -> MemoryBackend {
        let store = MemoryBackend::new();
        store.put("input", "data.txt", body.to_vec()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_head_reports_size() {
        let store = store_with(b"0123456789").await;
        let meta = store.head("input", "data.txt").await.unwrap();
        assert_eq!(meta.size, 10);
        assert!(meta.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_head_missing_object() {
        let store = MemoryBackend::new();
        let err = store.head("input", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_range_exact_bytes() {
        let store = store_with(b"0123456789abcdef").await;
        let mut sink = Vec::new();
        let read = store
            .read_range("input", "data.txt", ChunkRange::new(10, 12).unwrap(), &mut sink)
            .await
            .unwrap();
        assert_eq!(read, 3);
        assert_eq!(sink, b"abc");
    }

    #[tokio::test]
    async fn test_read_range_clamps_past_end() {
        let store = store_with(b"01234").await;
        let mut sink = Vec::new();
        store
            .read_range("input", "data.txt", ChunkRange::new(3, 99).unwrap(), &mut sink)
            .await
            .unwrap();
        assert_eq!(sink, b"34");
    }

    #[tokio::test]
    async fn test_put_overwrites_and_lists_by_prefix() {
        let store = MemoryBackend::new();
        store.put("out", "results/a-0-9.json", b"1".to_vec()).await.unwrap();
        store.put("out", "results/a-0-9.json", b"2".to_vec()).await.unwrap();
        store.put("out", "results/b-0-9.json", b"3".to_vec()).await.unwrap();
        store.put("other", "results/a-0-9.json", b"4".to_vec()).await.unwrap();

        assert_eq!(store.object_count().await, 3);
        assert_eq!(
            store.get("out", "results/a-0-9.json").await.unwrap(),
            Some(b"2".to_vec())
        );
        assert_eq!(
            store.list("out", "results/a").await.unwrap(),
            vec!["results/a-0-9.json".to_string()]
        );
        assert_eq!(store.get("out", "nope").await.unwrap(), None);
    }
}
