//! Directory spool queue
//!
//! Each message is one JSON file. Published messages land in `ready/`;
//! receiving claims a file by renaming it into `inflight/`, so concurrent
//! consumers never hand out the same file twice. Ack deletes the claimed
//! file, release renames it back into `ready/`.
//!
//! A claim is stamped by rewriting the file, so its modification time is
//! the receive time. Claims older than the visibility timeout are moved
//! back to `ready/` at the start of every receive, which is how messages
//! held by a consumer that died or dropped its batch become visible again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::queue::{
    error::{QueueError, QueueResult},
    traits::{ChunkPublisher, DeliverySource},
    types::{Delivery, OutboundMessage},
};

const READY_DIR: &str = "ready";
const INFLIGHT_DIR: &str = "inflight";
const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(300);

/// On-disk message record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpooledMessage {
    message_id: String,
    sent_at: DateTime<Utc>,
    body: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    receive_count: u32,
}

/// Directory-backed queue implementing both publisher and source
#[derive(Debug, Clone)]
pub struct SpoolQueue {
    root: PathBuf,
    visibility_timeout: Duration,
}

impl SpoolQueue {
    /// Open (creating if needed) a spool rooted at `root`
    pub async fn open(root: impl AsRef<Path>) -> QueueResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(READY_DIR)).await?;
        fs::create_dir_all(root.join(INFLIGHT_DIR)).await?;
        Ok(Self {
            root,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        })
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ready_path(&self, name: &str) -> PathBuf {
        self.root.join(READY_DIR).join(name)
    }

    fn inflight_path(&self, name: &str) -> PathBuf {
        self.root.join(INFLIGHT_DIR).join(name)
    }

    /// Message file names in `dir`, oldest first
    async fn file_names(&self, dir: &str) -> QueueResult<Vec<String>> {
        let mut entries = fs::read_dir(self.root.join(dir)).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Number of messages waiting in `ready/`
    pub async fn ready_len(&self) -> QueueResult<usize> {
        Ok(self.file_names(READY_DIR).await?.len())
    }

    /// Number of claimed messages not yet acked or released
    pub async fn inflight_len(&self) -> QueueResult<usize> {
        Ok(self.file_names(INFLIGHT_DIR).await?.len())
    }

    /// Move every claimed message back to `ready/` regardless of age,
    /// e.g. when the operator knows no consumer is running
    pub async fn recover_inflight(&self) -> QueueResult<usize> {
        let names = self.file_names(INFLIGHT_DIR).await?;
        let mut recovered = 0;
        for name in &names {
            if self.unclaim(name).await? {
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    /// Move claims older than the visibility timeout back to `ready/`
    pub async fn requeue_expired(&self) -> QueueResult<usize> {
        let now = SystemTime::now();
        let mut requeued = 0;
        for name in self.file_names(INFLIGHT_DIR).await? {
            let modified = match fs::metadata(self.inflight_path(&name)).await {
                Ok(meta) => meta.modified()?,
                // Acked or released since the listing
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(QueueError::Io(e)),
            };
            // A claim stamped in the future counts as fresh
            let age = now.duration_since(modified).unwrap_or_default();
            if age >= self.visibility_timeout && self.unclaim(&name).await? {
                debug!(file = %name, age_ms = age.as_millis() as u64, "Claim expired");
                requeued += 1;
            }
        }
        if requeued > 0 {
            info!(requeued, "Requeued expired spool claims");
        }
        Ok(requeued)
    }

    /// Rename a claimed file back into `ready/`. `false` when it is gone.
    async fn unclaim(&self, name: &str) -> QueueResult<bool> {
        match fs::rename(self.inflight_path(name), self.ready_path(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(QueueError::Io(e)),
        }
    }

    async fn write_bytes_atomic(path: &Path, content: &[u8]) -> QueueResult<()> {
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, path).await?;
        Ok(())
    }

    async fn write_atomic(path: &Path, record: &SpooledMessage) -> QueueResult<()> {
        let content = serde_json::to_vec_pretty(record)?;
        Self::write_bytes_atomic(path, &content).await
    }

    /// Claim one ready file. `None` when another consumer got there first.
    async fn claim(&self, name: &str) -> QueueResult<Option<Delivery>> {
        let inflight = self.inflight_path(name);
        match fs::rename(self.ready_path(name), &inflight).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(QueueError::Io(e)),
        }

        match self.stamp_claim(name, &inflight).await {
            Ok(delivery) => Ok(Some(delivery)),
            Err(e) => {
                if let Err(undo) = self.unclaim(name).await {
                    warn!(file = %name, error = %undo, "Failed to return claim to ready");
                }
                Err(e)
            }
        }
    }

    /// Bump the receive count and refresh the claim time of a claimed file
    async fn stamp_claim(&self, name: &str, inflight: &Path) -> QueueResult<Delivery> {
        let content = fs::read(inflight).await?;
        let mut record: SpooledMessage = match serde_json::from_slice(&content) {
            Ok(record) => record,
            Err(e) => {
                // Unreadable record: hand it out as-is so the worker reports and skips it
                warn!(file = %name, error = %e, "Spool file is not a valid message record");
                Self::write_bytes_atomic(inflight, &content).await?;
                let mut delivery = Delivery::new(name, String::from_utf8_lossy(&content));
                delivery.receipt = Some(name.to_string());
                return Ok(delivery);
            }
        };

        record.receive_count += 1;
        Self::write_atomic(inflight, &record).await?;

        Ok(Delivery {
            message_id: record.message_id,
            receipt: Some(name.to_string()),
            body: record.body,
            attributes: record.attributes,
            receive_count: record.receive_count,
        })
    }

    fn receipt_of(delivery: &Delivery) -> QueueResult<&str> {
        let receipt = delivery
            .receipt
            .as_deref()
            .ok_or_else(|| QueueError::unknown_receipt("<none>"))?;
        // Receipts are bare file names; anything else cannot have come from this spool
        if receipt.contains(['/', '\\']) || !receipt.ends_with(".json") {
            return Err(QueueError::unknown_receipt(receipt));
        }
        Ok(receipt)
    }
}

#[async_trait]
impl ChunkPublisher for SpoolQueue {
    fn backend_name(&self) -> &'static str {
        "spool"
    }

    async fn publish(&self, message: OutboundMessage) -> QueueResult<String> {
        let sent_at = Utc::now();
        let message_id = Uuid::new_v4().to_string();
        // Timestamp first so lexical order is publish order
        let name = format!(
            "{}-{}.json",
            sent_at.format("%Y%m%dT%H%M%S%.9f"),
            message_id
        );

        let record = SpooledMessage {
            message_id: message_id.clone(),
            sent_at,
            body: message.body,
            attributes: message.attributes,
            receive_count: 0,
        };
        Self::write_atomic(&self.ready_path(&name), &record).await?;

        debug!(message_id = %message_id, file = %name, "Spooled message");
        Ok(message_id)
    }
}

#[async_trait]
impl DeliverySource for SpoolQueue {
    async fn receive(&self, max: usize) -> QueueResult<Vec<Delivery>> {
        self.requeue_expired().await?;

        let mut deliveries: Vec<Delivery> = Vec::new();
        for name in self.file_names(READY_DIR).await? {
            if deliveries.len() >= max {
                break;
            }
            match self.claim(&name).await {
                Ok(Some(delivery)) => deliveries.push(delivery),
                Ok(None) => {}
                Err(e) => {
                    // Return the claims made by this failed receive
                    for delivery in &deliveries {
                        if let Some(receipt) = delivery.receipt.as_deref() {
                            if let Err(undo) = self.unclaim(receipt).await {
                                warn!(file = %receipt, error = %undo, "Failed to return claim to ready");
                            }
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(deliveries)
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        let receipt = Self::receipt_of(delivery)?;
        match fs::remove_file(self.inflight_path(receipt)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(QueueError::unknown_receipt(receipt))
            }
            Err(e) => Err(QueueError::Io(e)),
        }
    }

    async fn release(&self, delivery: &Delivery) -> QueueResult<()> {
        let receipt = Self::receipt_of(delivery)?;
        if self.unclaim(receipt).await? {
            Ok(())
        } else {
            Err(QueueError::unknown_receipt(receipt))
        }
    }
}
