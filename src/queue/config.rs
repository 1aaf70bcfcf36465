//! Queue configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Queue backend type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackendType {
    /// Directory spool (default)
    #[default]
    Spool,
    /// Process memory
    Memory,
    /// SNS topic (publish only)
    Sns,
}

impl QueueBackendType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "spool" => Some(Self::Spool),
            "memory" => Some(Self::Memory),
            "sns" => Some(Self::Sns),
            _ => None,
        }
    }
}

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub backend: QueueBackendType,

    /// Spool directory
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,

    /// Destination topic ARN for the SNS backend
    #[serde(default)]
    pub topic: Option<String>,

    /// Custom AWS endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    /// Deliveries of one message before it is dead-lettered
    #[serde(default = "default_max_receive_count")]
    pub max_receive_count: u32,

    /// How long a received message stays hidden before the spool hands it
    /// out again
    #[serde(with = "humantime_serde", default = "default_visibility_timeout")]
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackendType::default(),
            spool_dir: default_spool_dir(),
            topic: None,
            endpoint: None,
            region: None,
            max_receive_count: default_max_receive_count(),
            visibility_timeout: default_visibility_timeout(),
        }
    }
}

impl QueueConfig {
    pub fn memory() -> Self {
        Self {
            backend: QueueBackendType::Memory,
            ..Default::default()
        }
    }

    pub fn spool(dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: QueueBackendType::Spool,
            spool_dir: dir.into(),
            ..Default::default()
        }
    }
}

fn default_spool_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chunkfan")
        .join("spool")
}

fn default_max_receive_count() -> u32 {
    3
}

fn default_visibility_timeout() -> Duration {
    Duration::from_secs(300)
}
