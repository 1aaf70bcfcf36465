//! Queue factory

use std::sync::Arc;

use super::backends::{MemoryQueue, SpoolQueue};
#[cfg(feature = "sns")]
use super::backends::SnsPublisher;
use super::config::{QueueBackendType, QueueConfig};
use super::error::QueueResult;
use super::traits::{ChunkPublisher, DeliverySource};

/// Publisher and, where the backend supports consuming, the matching source
#[derive(Clone)]
pub struct QueueHandles {
    pub publisher: Arc<dyn ChunkPublisher>,
    pub source: Option<Arc<dyn DeliverySource>>,
}

/// Factory for creating queue collaborators
pub struct QueueFactory;

impl QueueFactory {
    pub async fn from_config(config: &QueueConfig) -> QueueResult<QueueHandles> {
        match &config.backend {
            QueueBackendType::Spool => {
                let spool = Arc::new(
                    SpoolQueue::open(&config.spool_dir)
                        .await?
                        .with_visibility_timeout(config.visibility_timeout),
                );
                Ok(QueueHandles {
                    publisher: spool.clone(),
                    source: Some(spool),
                })
            }
            QueueBackendType::Memory => {
                let queue = Arc::new(MemoryQueue::new());
                Ok(QueueHandles {
                    publisher: queue.clone(),
                    source: Some(queue),
                })
            }
            #[cfg(feature = "sns")]
            QueueBackendType::Sns => {
                let publisher = SnsPublisher::new(config).await?;
                Ok(QueueHandles {
                    publisher: Arc::new(publisher),
                    source: None,
                })
            }
            #[cfg(not(feature = "sns"))]
            QueueBackendType::Sns => Err(super::error::QueueError::configuration(
                "SNS backend not enabled. Enable with --features sns",
            )),
        }
    }
}
