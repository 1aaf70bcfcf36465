//! `chunkfan drain`: consume the configured queue

use anyhow::Result;
use std::path::Path;

use super::load_config;
use crate::pipeline::LocalPipeline;

pub async fn run_drain_command(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let pipeline = LocalPipeline::from_config(&config).await?;
    let report = pipeline.drain().await?;

    println!(
        "Drained {} batch(es): {} processed, {} skipped, {} released, {} dead-lettered",
        report.batches,
        report.processed,
        report.skipped,
        report.released,
        report.dead_letters.len()
    );
    if report.settle_failures > 0 {
        eprintln!(
            "{} delivery(ies) could not be settled and will be redelivered",
            report.settle_failures
        );
    }
    for dead in &report.dead_letters {
        eprintln!(
            "dead-lettered {} after {} receive(s): {}",
            dead.message_id, dead.receive_count, dead.error
        );
    }
    Ok(())
}
