//! Storage backend implementations.

#[cfg(feature = "local")]
pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

#[cfg(feature = "local")]
pub use local::LocalStorage;
pub use memory::{MemoryBucketManager, MemoryStorage};
#[cfg(feature = "s3")]
pub use s3::S3Storage;
