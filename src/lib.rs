//! # chunkfan
//!
//! Range-partitioned fan-out/fan-in word counting over blob storage.
//!
//! ## Usage
//!
//! ```bash
//! chunkfan plan --size 25 --chunk-size 10
//! chunkfan run --bucket input --key data.txt
//! ```
//!
//! ## Modules
//!
//! - `chunk` - Byte ranges, chunk descriptors, result records and word counting
//! - `partitioner` - Slices objects into ranges and publishes one descriptor per range
//! - `worker` - Fetches one range per delivery, counts words, writes the result record
//! - `aggregate` - Checks chunk coverage of an object and writes its total
//! - `pipeline` - In-process driver running partition, drain and aggregate
//! - `storage` - Object store trait with file, memory and S3 backends
//! - `queue` - Publish and delivery traits with spool, memory and SNS backends
//! - `events` - S3 object-arrival notifications
//! - `config` - Pipeline configuration from TOML and environment
//! - `cli` - Command-line interface
pub mod aggregate;
pub mod chunk;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod partitioner;
pub mod pipeline;
pub mod queue;
pub mod storage;
pub mod worker;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
