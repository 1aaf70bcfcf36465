//! Chunk model: ranges, descriptors, result records and word counting
//!
//! Everything in this module is free of I/O except the async reader
//! adapter in [`wordcount`].

pub mod descriptor;
pub mod range;
pub mod result;
pub mod wordcount;

pub use descriptor::{ChunkDescriptor, CHUNK_NUMBER_ATTRIBUTE};
pub use range::{chunk_count, partition, ChunkRange, InvalidRange, Partition, DEFAULT_CHUNK_SIZE};
pub use result::{
    output_location, parse_record_range, records_prefix, summary_location, ProcessingResult,
    DEFAULT_RESULTS_PREFIX,
};
pub use wordcount::{count_words, count_words_in, WordCounter};
