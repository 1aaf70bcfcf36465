//! Object storage trait

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use super::error::StorageResult;
use super::types::ObjectMeta;
use crate::chunk::ChunkRange;

/// Writer a range read streams into
pub type RangeSink<'a> = dyn AsyncWrite + Send + Unpin + 'a;

/// Blob storage operations the pipeline depends on
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name used in logs and URIs
    fn backend_name(&self) -> &'static str;

    /// Fully qualified URI of an object
    fn uri(&self, bucket: &str, key: &str) -> String;

    /// Metadata lookup without downloading the body
    async fn head(&self, bucket: &str, key: &str) -> StorageResult<ObjectMeta>;

    /// Stream the bytes of `range` into `sink`, returning the number of bytes written.
    /// The start must lie inside the object; the end is clamped to the object size.
    async fn read_range(
        &self,
        bucket: &str,
        key: &str,
        range: ChunkRange,
        sink: &mut RangeSink<'_>,
    ) -> StorageResult<u64>;

    /// Read a whole object, `None` when it does not exist
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Create or overwrite an object
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()>;

    /// Keys in `bucket` starting with `prefix`, sorted
    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>>;
}
