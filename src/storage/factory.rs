//! Storage factory for creating object store instances

use std::sync::Arc;

use super::backends::{FileBackend, MemoryBackend};
#[cfg(feature = "s3")]
use super::backends::S3Backend;
use super::config::{BackendType, StorageConfig};
use super::error::StorageResult;
use super::traits::ObjectStore;

/// Factory for creating object stores
pub struct StorageFactory;

impl StorageFactory {
    /// Create an object store from explicit configuration
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
        match &config.backend {
            BackendType::File => {
                let backend = FileBackend::new(config).await?;
                Ok(Arc::new(backend))
            }
            BackendType::Memory => Ok(Arc::new(MemoryBackend::new())),
            #[cfg(feature = "s3")]
            BackendType::S3 => {
                let backend = S3Backend::new(config).await?;
                Ok(Arc::new(backend))
            }
            #[cfg(not(feature = "s3"))]
            BackendType::S3 => Err(super::error::StorageError::configuration(
                "S3 backend not enabled. Enable with --features s3",
            )),
        }
    }
}
