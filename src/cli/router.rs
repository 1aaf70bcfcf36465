//! Command routing

use anyhow::Result;
use std::path::Path;

use crate::cli::args::Commands;
use crate::cli::commands::*;

/// Execute a CLI command
pub async fn execute_command(command: Commands, config: Option<&Path>) -> Result<()> {
    match command {
        Commands::Plan {
            size,
            chunk_size,
            json,
        } => run_plan_command(size, chunk_size, json, config),
        Commands::Partition { event } => run_partition_command(&event, config).await,
        Commands::Work { batch } => run_work_command(&batch, config).await,
        Commands::Drain => run_drain_command(config).await,
        Commands::Run { bucket, key } => run_pipeline_command(&bucket, &key, config).await,
        Commands::Aggregate { bucket, key } => run_aggregate_command(&bucket, &key, config).await,
    }
}
