//! Storage contract shared by every backend.

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::Cursor;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Readable byte stream handed between callers and backends.
///
/// Ownership of a stream returned from [`Storage::read`] moves to the caller,
/// who releases it by dropping it.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Wrap an in-memory buffer as a [`ByteStream`].
pub fn byte_stream(content: impl Into<Bytes>) -> ByteStream {
	Box::pin(Cursor::new(content.into()))
}

/// Read a stream to the end and release it.
pub async fn collect_stream(mut stream: ByteStream) -> Result<Bytes> {
	let mut buffer = Vec::new();
	stream.read_to_end(&mut buffer).await?;
	Ok(Bytes::from(buffer))
}

/// Storage backend trait for unified storage operations.
///
/// This trait defines a common interface for all storage backends
/// (local file system, S3-compatible object stores, in-memory storage) and
/// for [`LinkedStorage`](crate::LinkedStorage), which composes several of them.
///
/// Backends implement the streaming forms only; the byte-buffer forms
/// ([`store_bytes`](Storage::store_bytes), [`read_bytes`](Storage::read_bytes))
/// are provided in terms of them. Blocking callers use
/// [`BlockingStorage`](crate::BlockingStorage).
///
/// Paths are logical keys; a leading `/` is ignored (see
/// [`normalize_key`](crate::path::normalize_key)).
///
/// # Examples
///
/// ```rust,no_run
/// use linkstore_storages::{Result, Storage};
///
/// async fn example(storage: &dyn Storage) -> Result<()> {
///     storage.store_bytes("a/b.txt", vec![1, 2, 3].into(), true).await?;
///
///     if storage.exists("a/b.txt").await? {
///         let content = storage.read_bytes("a/b.txt").await?;
///         assert_eq!(&content[..], &[1, 2, 3]);
///     }
///
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Storage: Send + Sync {
	/// Logical name of this backend instance.
	fn name(&self) -> &str;

	/// Store an object from a stream.
	///
	/// # Arguments
	///
	/// * `path` - The object key
	/// * `content` - The object content
	/// * `overwrite` - Whether an existing object may be replaced
	///
	/// # Returns
	///
	/// The normalised logical path of the stored object.
	///
	/// # Errors
	///
	/// Returns `` `StorageError::AlreadyExists` `` if the object exists and
	/// `overwrite` is false; nothing is written in that case.
	/// Returns `` `StorageError::Transport` `` if the medium call fails.
	async fn store(&self, path: &str, content: ByteStream, overwrite: bool) -> Result<String>;

	/// Store an object from an in-memory buffer.
	async fn store_bytes(&self, path: &str, content: Bytes, overwrite: bool) -> Result<String> {
		self.store(path, byte_stream(content), overwrite).await
	}

	/// Open an object for reading.
	///
	/// # Errors
	///
	/// Returns `` `StorageError::NotFound` `` if the object doesn't exist.
	async fn read(&self, path: &str) -> Result<ByteStream>;

	/// Read a whole object into memory.
	async fn read_bytes(&self, path: &str) -> Result<Bytes> {
		let stream = self.read(path).await?;
		collect_stream(stream).await
	}

	/// Check whether an object exists.
	///
	/// Absence is `Ok(false)`; only transport failures are errors.
	async fn exists(&self, path: &str) -> Result<bool>;

	/// Resolve the absolute address of an object.
	///
	/// For local storage this is a filesystem path, for object stores a
	/// public URL.
	///
	/// # Errors
	///
	/// Returns `` `StorageError::NotFound` `` if the object doesn't exist.
	async fn absolute_path(&self, path: &str) -> Result<String>;
}
