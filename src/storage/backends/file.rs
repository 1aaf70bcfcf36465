//! File-based object store
//!
//! Objects live at `<base_dir>/<bucket>/<key>`; key separators become
//! directories. Writes go through a temporary sibling file and a rename so
//! an overwrite is never observed half written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use crate::chunk::ChunkRange;
use crate::storage::{
    config::StorageConfig,
    error::{StorageError, StorageResult},
    traits::{ObjectStore, RangeSink},
    types::{satisfiable_range, ObjectMeta},
};

const TEMP_PREFIX: &str = ".chunkfan-tmp-";

/// File-based object store
#[derive(Debug, Clone)]
pub struct FileBackend {
    base_dir: PathBuf,
}

impl FileBackend {
    /// Create a new file backend, creating the base directory if needed
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        Self::with_base_dir(&config.base_dir).await
    }

    /// Open a store rooted at `base_dir`, held as an absolute path so
    /// object URIs are usable from any working directory
    pub async fn with_base_dir(base_dir: impl AsRef<Path>) -> StorageResult<Self> {
        let base_dir = base_dir.as_ref();
        fs::create_dir_all(base_dir).await?;
        let base_dir = fs::canonicalize(base_dir).await?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn checked_part<'a>(label: &str, part: &'a str) -> StorageResult<&'a Path> {
        let relative = Path::new(part);
        let is_safe = !part.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_safe {
            return Err(StorageError::configuration(format!(
                "Invalid {} for file storage: {:?}",
                label, part
            )));
        }
        Ok(relative)
    }

    fn bucket_path(&self, bucket: &str) -> StorageResult<PathBuf> {
        Ok(self.base_dir.join(Self::checked_part("bucket", bucket)?))
    }

    /// Filesystem path of an object, rejecting keys that escape the bucket
    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        Ok(self
            .bucket_path(bucket)?
            .join(Self::checked_part("key", key)?))
    }

    async fn open_existing(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<(fs::File, std::fs::Metadata)> {
        let path = self.object_path(bucket, key)?;
        match fs::File::open(&path).await {
            Ok(file) => {
                let metadata = file.metadata().await?;
                Ok((file, metadata))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(format!("{}/{}", bucket, key)))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn collect_keys(root: &Path) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::Io(e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(root) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl ObjectStore for FileBackend {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn uri(&self, bucket: &str, key: &str) -> String {
        format!("file://{}/{}/{}", self.base_dir.display(), bucket, key)
    }

    async fn head(&self, bucket: &str, key: &str) -> StorageResult<ObjectMeta> {
        let (_, metadata) = self.open_existing(bucket, key).await?;

        Ok(ObjectMeta {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    async fn read_range(
        &self,
        bucket: &str,
        key: &str,
        range: ChunkRange,
        sink: &mut RangeSink<'_>,
    ) -> StorageResult<u64> {
        let (mut file, metadata) = self.open_existing(bucket, key).await?;
        let (start, end) = satisfiable_range(range, metadata.len())?;

        file.seek(std::io::SeekFrom::Start(start)).await?;
        let mut limited = file.take(end - start + 1);
        let copied = tokio::io::copy(&mut limited, sink).await?;
        sink.flush().await?;

        debug!(bucket, key, start, end, copied, "Read range from file store");
        Ok(copied)
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.object_path(bucket, key)?;
        match fs::read(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::configuration("Object path has no parent"))?;
        fs::create_dir_all(parent).await?;

        let temp_path = parent.join(format!("{}{}", TEMP_PREFIX, uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&temp_path).await?;
        let written = async {
            file.write_all(&body).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let root = self.bucket_path(bucket)?;
        let mut keys = Self::collect_keys(&root).await?;
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}
