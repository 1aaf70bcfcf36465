//! Command implementation modules

pub mod aggregate;
pub mod drain;
pub mod partition;
pub mod plan;
pub mod run;
pub mod work;

pub use aggregate::run_aggregate_command;
pub use drain::run_drain_command;
pub use partition::run_partition_command;
pub use plan::run_plan_command;
pub use run::run_pipeline_command;
pub use work::run_work_command;

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::PipelineConfig;

/// Load and validate configuration for a command
pub(crate) fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    PipelineConfig::load(path).context("Failed to load configuration")
}

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
