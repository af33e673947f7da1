//! # linkstore-storages
//!
//! Storage backend contract with fan-out replication.
//!
//! This crate provides a single storage contract implemented by
//! interchangeable backends (local file system, S3-compatible object stores,
//! in-memory storage), and [`LinkedStorage`], which writes to every member
//! backend and reads from the first member that holds the object.
//!
//! ## Features
//!
//! - **Unified API**: Single `` `Storage` `` trait for all backends, with a
//!   blocking form in `` `BlockingStorage` ``
//! - **Replication**: `` `LinkedStorage` `` fans writes out to all members and
//!   reports every member that failed
//! - **Object stores**: Paginated listings and time-limited upload tickets via
//!   `` `ObjectStorage` ``
//! - **Feature Flags**: Enable only the backends you need (`local`, `s3`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use linkstore_storages::{Storage, StorageSettings, build_registry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load backends and the linked storage from a settings file
//!     let settings = StorageSettings::from_file("storage.toml")?;
//!     let registry = build_registry(&settings).await?;
//!
//!     // Store once, replicated to every member
//!     let storage = registry.get("linked")?;
//!     storage.store_bytes("a/b.txt", vec![1, 2, 3].into(), true).await?;
//!
//!     // Read from the first member holding the object
//!     let content = storage.read_bytes("a/b.txt").await?;
//!     assert_eq!(&content[..], &[1, 2, 3]);
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod backends;
pub mod blocking;
pub mod config;
pub mod error;
pub mod factory;
pub mod linked;
pub mod object;
pub mod path;
pub mod registry;

pub use backend::{ByteStream, Storage, byte_stream, collect_stream};
#[cfg(feature = "local")]
pub use backends::LocalStorage;
pub use backends::{MemoryBucketManager, MemoryStorage};
#[cfg(feature = "s3")]
pub use backends::S3Storage;
pub use blocking::BlockingStorage;
pub use config::{StorageConfig, StorageSettings};
pub use error::{ErrorKind, MemberFailure, Result, StorageError};
pub use factory::{build_registry, create_object_storage, create_storage};
pub use linked::{LinkedMember, LinkedStorage};
pub use object::{
	BucketListing, ListedFile, ObjectStorage, ObjectStorageManager, UploadTicket,
};
pub use registry::StorageRegistry;
