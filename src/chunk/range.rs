//! Byte ranges and the partitioning rule
//!
//! A [`ChunkRange`] is an inclusive `[start, end]` interval of a source
//! object. [`partition`] slices an object of a given size into the unique
//! ordered sequence of ranges that covers it exactly: contiguous, no gaps,
//! no overlaps, and no range longer than the chunk size.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use thiserror::Error;

/// Default chunk size: 10 MiB
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Invalid range bounds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid chunk range: end {end} is before start {start}")]
pub struct InvalidRange {
    pub start: u64,
    pub end: u64,
}

/// Inclusive byte range of a source object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct ChunkRange {
    start: u64,
    end: u64,
}

#[derive(Deserialize)]
struct RawRange {
    start: u64,
    end: u64,
}

impl TryFrom<RawRange> for ChunkRange {
    type Error = InvalidRange;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        ChunkRange::new(raw.start, raw.end)
    }
}

impl ChunkRange {
    /// Create a range, rejecting `end < start`
    pub fn new(start: u64, end: u64) -> Result<Self, InvalidRange> {
        if end < start {
            return Err(InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered. Never zero.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// HTTP `Range` header value for this chunk
    pub fn http_range(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Number of ranges a partition of `object_size` bytes produces
pub fn chunk_count(object_size: u64, chunk_size: NonZeroU64) -> u64 {
    object_size.div_ceil(chunk_size.get())
}

/// Partition `object_size` bytes into ranges of at most `chunk_size` bytes.
///
/// An empty object yields no ranges.
pub fn partition(object_size: u64, chunk_size: NonZeroU64) -> Partition {
    Partition {
        next_start: Some(0),
        object_size,
        chunk_size: chunk_size.get(),
        remaining: chunk_count(object_size, chunk_size),
    }
}

/// Iterator over the ranges of a partition, in offset order
#[derive(Debug, Clone)]
pub struct Partition {
    next_start: Option<u64>,
    object_size: u64,
    chunk_size: u64,
    remaining: u64,
}

impl Iterator for Partition {
    type Item = ChunkRange;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        if start >= self.object_size {
            self.next_start = None;
            return None;
        }

        let last = self.object_size - 1;
        let end = start.saturating_add(self.chunk_size - 1).min(last);
        // `checked_add` stops the iteration at the top of the u64 space
        self.next_start = start.checked_add(self.chunk_size);
        self.remaining = self.remaining.saturating_sub(1);

        Some(ChunkRange { start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Partition {}

impl std::iter::FusedIterator for Partition {}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    fn pairs(object_size: u64, chunk_size: u64) -> Vec<(u64, u64)> {
        partition(object_size, size(chunk_size))
            .map(|r| (r.start(), r.end()))
            .collect()
    }

    #[test]
    fn test_partition_with_remainder() {
        assert_eq!(pairs(25, 10), vec![(0, 9), (10, 19), (20, 24)]);
    }

    #[test]
    fn test_partition_exact_multiple_has_no_trailing_range() {
        assert_eq!(pairs(10, 10), vec![(0, 9)]);
        assert_eq!(pairs(30, 10), vec![(0, 9), (10, 19), (20, 29)]);
    }

    #[test]
    fn test_partition_empty_object() {
        assert!(pairs(0, 10).is_empty());
        assert_eq!(partition(0, size(10)).len(), 0);
    }

    #[test]
    fn test_partition_smaller_than_chunk() {
        assert_eq!(pairs(3, 10), vec![(0, 2)]);
        assert_eq!(pairs(1, 1), vec![(0, 0)]);
    }

    #[test]
    fn test_partition_near_u64_max_terminates() {
        let ranges: Vec<_> = partition(u64::MAX, size(u64::MAX / 2 + 1)).collect();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].end(), u64::MAX - 1);
    }

    #[test]
    fn test_exact_size_matches_chunk_count() {
        let iter = partition(1_000_003, size(4096));
        assert_eq!(iter.len() as u64, chunk_count(1_000_003, size(4096)));
        assert_eq!(iter.count(), 245);
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert_eq!(
            ChunkRange::new(5, 4),
            Err(InvalidRange { start: 5, end: 4 })
        );
        assert_eq!(ChunkRange::new(4, 4).unwrap().len(), 1);
    }

    #[test]
    fn test_range_deserialization_validates() {
        let ok: ChunkRange = serde_json::from_str(r#"{"start": 10, "end": 19}"#).unwrap();
        assert_eq!(ok.len(), 10);

        let err = serde_json::from_str::<ChunkRange>(r#"{"start": 10, "end": 9}"#);
        assert!(err.is_err());

        let negative = serde_json::from_str::<ChunkRange>(r#"{"start": -1, "end": 9}"#);
        assert!(negative.is_err());
    }

    #[test]
    fn test_http_range_header() {
        let range = ChunkRange::new(10, 19).unwrap();
        assert_eq!(range.http_range(), "bytes=10-19");
        assert_eq!(range.to_string(), "[10, 19]");
    }
}
