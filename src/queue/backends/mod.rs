//! Queue backend implementations

pub mod memory;
#[cfg(feature = "sns")]
pub mod sns;
pub mod spool;

pub use memory::MemoryQueue;
#[cfg(feature = "sns")]
pub use sns::SnsPublisher;
pub use spool::SpoolQueue;
