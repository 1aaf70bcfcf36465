//! `chunkfan partition`: run the partitioner on an S3 notification

use anyhow::{Context, Result};
use std::path::Path;

use super::load_config;
use crate::events::ObjectArrivalEvent;
use crate::partitioner::Partitioner;
use crate::queue::QueueFactory;
use crate::storage::StorageFactory;

pub async fn run_partition_command(event_path: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;

    let content = tokio::fs::read_to_string(event_path)
        .await
        .with_context(|| format!("Failed to read event file {}", event_path.display()))?;
    let event = ObjectArrivalEvent::from_s3_json(&content)
        .with_context(|| format!("Invalid S3 notification in {}", event_path.display()))?;

    let store = StorageFactory::from_config(&config.storage).await?;
    let queue = QueueFactory::from_config(&config.queue).await?;
    let partitioner = Partitioner::new(store, queue.publisher, config.chunk_size()?);

    for report in partitioner.handle_event(&event).await? {
        println!(
            "{}/{}: {} bytes, {} chunk(s) dispatched",
            report.bucket, report.key, report.object_size, report.dispatched
        );
    }
    Ok(())
}
