//! Storage configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Storage backend type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Local directory tree, one directory per bucket (default)
    #[default]
    File,
    /// Process memory (for testing and in-process runs)
    Memory,
    /// Amazon S3 or an S3-compatible endpoint
    S3,
}

impl BackendType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            "s3" => Some(Self::S3),
            _ => None,
        }
    }
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: BackendType,

    /// Root directory of the file backend
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Custom S3 endpoint (MinIO, LocalStack); enables path-style addressing
    #[serde(default)]
    pub endpoint: Option<String>,

    /// S3 region override
    #[serde(default)]
    pub region: Option<String>,

    /// Per-operation timeout for remote backends
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            base_dir: default_base_dir(),
            endpoint: None,
            region: None,
            timeout: default_timeout(),
        }
    }
}

impl StorageConfig {
    /// In-memory storage configuration
    pub fn memory() -> Self {
        Self {
            backend: BackendType::Memory,
            ..Default::default()
        }
    }

    /// File storage rooted at `base_dir`
    pub fn file(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendType::File,
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }
}

/// `~/.chunkfan/objects`, or `./.chunkfan/objects` without a home directory
pub(crate) fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chunkfan")
        .join("objects")
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}
