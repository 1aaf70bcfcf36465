//! `chunkfan work`: process one SQS batch event

use anyhow::{Context, Result};
use std::path::Path;

use super::{load_config, print_json};
use crate::queue::SqsEvent;
use crate::storage::StorageFactory;
use crate::worker::Worker;

/// Prints the partial batch response; failed items are left to the
/// caller's redelivery mechanism
pub async fn run_work_command(batch_path: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;

    let content = tokio::fs::read_to_string(batch_path)
        .await
        .with_context(|| format!("Failed to read batch file {}", batch_path.display()))?;
    let event: SqsEvent = serde_json::from_str(&content)
        .with_context(|| format!("Invalid SQS event in {}", batch_path.display()))?;

    let store = StorageFactory::from_config(&config.storage).await?;
    let worker = Worker::new(store, &config);
    let report = worker.process_batch(event.into_deliveries()).await;

    print_json(&report.batch_item_failures())
}
