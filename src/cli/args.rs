//! CLI argument structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Partition objects into byte ranges and count words per range
#[derive(Parser)]
#[command(name = "chunkfan")]
#[command(about = "chunkfan - Range-partitioned fan-out word counting", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the byte ranges an object of the given size is split into
    Plan {
        /// Object size in bytes
        #[arg(long)]
        size: u64,

        /// Chunk size in bytes (defaults to the configured chunk size)
        #[arg(long)]
        chunk_size: Option<u64>,

        /// Print the ranges as JSON
        #[arg(long)]
        json: bool,
    },

    /// Partition the objects named in an S3 event notification
    Partition {
        /// S3 notification JSON file
        event: PathBuf,
    },

    /// Process an SQS batch event and print the partial batch response
    Work {
        /// SQS event JSON file
        batch: PathBuf,
    },

    /// Consume the configured queue until it is empty
    Drain,

    /// Partition, process and aggregate one object in-process
    Run {
        #[arg(long)]
        bucket: String,

        #[arg(long)]
        key: String,
    },

    /// Check result coverage of one object and write its total
    Aggregate {
        #[arg(long)]
        bucket: String,

        #[arg(long)]
        key: String,
    },
}
