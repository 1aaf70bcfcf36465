//! Object storage abstraction
//!
//! The pipeline needs four things from blob storage: a metadata lookup for
//! the object size, a range read, a whole-object read and an overwrite-style
//! write. [`ObjectStore`] captures those; backends live in [`backends`].

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod traits;
pub mod types;

pub use backends::{FileBackend, MemoryBackend};
#[cfg(feature = "s3")]
pub use backends::S3Backend;
pub use config::{BackendType, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use traits::{ObjectStore, RangeSink};
pub use types::{satisfiable_range, ObjectMeta};
