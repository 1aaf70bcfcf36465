//! `chunkfan run`: partition, process and aggregate one object

use anyhow::Result;
use std::path::Path;

use super::{load_config, print_json};
use crate::pipeline::LocalPipeline;

pub async fn run_pipeline_command(bucket: &str, key: &str, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let pipeline = LocalPipeline::from_config(&config).await?;
    let report = pipeline.run(bucket, key).await?;

    if !report.drain.dead_letters.is_empty() {
        eprintln!(
            "{} chunk(s) were dead-lettered",
            report.drain.dead_letters.len()
        );
    }
    print_json(&report.aggregate)
}
