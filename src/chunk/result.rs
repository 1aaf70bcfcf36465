//! Per-chunk result records and their addressing

use serde::{Deserialize, Serialize};

use super::descriptor::ChunkDescriptor;
use super::range::ChunkRange;

/// Default key prefix for result records
pub const DEFAULT_RESULTS_PREFIX: &str = "results";

/// Result key for one chunk: `<prefix>/<key>-<start>-<end>.json`.
///
/// Pure function of its inputs, so a redelivered chunk overwrites its own
/// record instead of creating a second one.
pub fn output_location(prefix: &str, key: &str, range: ChunkRange) -> String {
    format!(
        "{}{}-{}-{}.json",
        prefix_dir(prefix),
        key,
        range.start(),
        range.end()
    )
}

/// Range named by a result key under `records_prefix`, from the
/// `<start>-<end>.json` remainder. `None` for anything else, including the
/// summary and the records of keys that merely share the prefix.
pub fn parse_record_range(records_prefix: &str, location: &str) -> Option<ChunkRange> {
    let rest = location.strip_prefix(records_prefix)?.strip_suffix(".json")?;
    let (start, end) = rest.split_once('-')?;
    ChunkRange::new(start.parse().ok()?, end.parse().ok()?).ok()
}

/// Common prefix of every result key of one source object
pub fn records_prefix(prefix: &str, key: &str) -> String {
    format!("{}{}-", prefix_dir(prefix), key)
}

/// Key of the aggregate summary for one source object
pub fn summary_location(prefix: &str, key: &str) -> String {
    format!("{}{}-total.json", prefix_dir(prefix), key)
}

fn prefix_dir(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// Word count of one chunk, as written to the results store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub bucket: String,
    pub key: String,
    pub chunk: ChunkRange,
    pub word_count: u64,
    /// Fully qualified URI of this record
    pub output_path: String,
}

impl ProcessingResult {
    pub fn new(descriptor: &ChunkDescriptor, word_count: u64, output_path: String) -> Self {
        Self {
            bucket: descriptor.bucket.clone(),
            key: descriptor.key.clone(),
            chunk: descriptor.chunk,
            word_count,
            output_path,
        }
    }

    /// Serialized record body
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
