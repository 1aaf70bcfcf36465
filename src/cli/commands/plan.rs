//! `chunkfan plan`: show how an object would be partitioned

use anyhow::{Context, Result};
use serde::Serialize;
use std::num::NonZeroU64;
use std::path::Path;

use super::{load_config, print_json};
use crate::chunk::{chunk_count, partition};

#[derive(Serialize)]
struct PlannedChunk {
    ordinal: u64,
    start: u64,
    end: u64,
}

pub fn run_plan_command(
    size: u64,
    chunk_size: Option<u64>,
    json: bool,
    config: Option<&Path>,
) -> Result<()> {
    let chunk_size = match chunk_size {
        Some(value) => value,
        None => load_config(config)?.chunk_size,
    };
    let chunk_size = NonZeroU64::new(chunk_size).context("--chunk-size must be greater than zero")?;

    let chunks: Vec<PlannedChunk> = (0u64..)
        .zip(partition(size, chunk_size))
        .map(|(ordinal, range)| PlannedChunk {
            ordinal,
            start: range.start(),
            end: range.end(),
        })
        .collect();

    if json {
        return print_json(&chunks);
    }

    println!(
        "{} chunk(s) for {} bytes at chunk size {}",
        chunk_count(size, chunk_size),
        size,
        chunk_size
    );
    for chunk in &chunks {
        println!(
            "  {:>4}  bytes {}-{} ({} bytes)",
            chunk.ordinal,
            chunk.start,
            chunk.end,
            chunk.end - chunk.start + 1
        );
    }
    Ok(())
}
