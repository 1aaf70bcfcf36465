//! Shared types for the object storage layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{StorageError, StorageResult};
use crate::chunk::ChunkRange;

/// Object metadata returned by a HEAD request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub bucket: String,
    pub key: String,
    /// Content length in bytes
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Resolve a requested range against an object size the way HTTP range
/// requests do: the start must fall inside the object, the end is clamped.
/// Returns the inclusive `(start, end)` actually served.
pub fn satisfiable_range(range: ChunkRange, size: u64) -> StorageResult<(u64, u64)> {
    if range.start() >= size {
        return Err(StorageError::InvalidRange {
            range: range.http_range(),
            size,
        });
    }
    Ok((range.start(), range.end().min(size - 1)))
}
