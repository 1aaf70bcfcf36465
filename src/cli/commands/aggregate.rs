//! `chunkfan aggregate`: report coverage and total of one object

use anyhow::{bail, Result};
use std::path::Path;

use super::{load_config, print_json};
use crate::aggregate::Aggregator;
use crate::storage::StorageFactory;

pub async fn run_aggregate_command(bucket: &str, key: &str, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let store = StorageFactory::from_config(&config.storage).await?;
    let report = Aggregator::new(store, &config)?.aggregate(bucket, key).await?;

    print_json(&report)?;
    if !report.complete {
        bail!(
            "{}/{} is missing {} of {} chunk result(s)",
            bucket,
            key,
            report.missing.len(),
            report.expected_chunks
        );
    }
    Ok(())
}
