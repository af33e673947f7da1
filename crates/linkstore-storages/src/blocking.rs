//! Blocking form of the storage contract.

use bytes::Bytes;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio_util::io::SyncIoBridge;

use crate::backend::{ByteStream, byte_stream};
use crate::object::{BucketListing, ObjectStorage, UploadTicket};
use crate::{Result, Storage};

/// Synchronous wrapper around any [`Storage`].
///
/// Every method drives the matching async method to completion on a runtime
/// owned by the wrapper, so results are identical to the async form. Works the
/// same for a single backend and for a [`LinkedStorage`](crate::LinkedStorage).
///
/// Must not be used (or dropped) from inside an async context.
///
/// # Examples
///
/// ```rust
/// use linkstore_storages::{BlockingStorage, MemoryStorage};
/// use std::io::Read;
/// use std::sync::Arc;
///
/// let storage = BlockingStorage::new(Arc::new(MemoryStorage::new("blobs"))).unwrap();
/// storage.store_bytes("a/b.txt", &b"hello"[..], true).unwrap();
///
/// let mut content = String::new();
/// storage.read("a/b.txt").unwrap().read_to_string(&mut content).unwrap();
/// assert_eq!(content, "hello");
/// ```
pub struct BlockingStorage<S: ?Sized> {
	inner: Arc<S>,
	runtime: Runtime,
}

impl<S: Storage + ?Sized> BlockingStorage<S> {
	/// Wrap `storage`, starting a small dedicated runtime.
	///
	/// # Errors
	///
	/// Returns `` `StorageError::Io` `` if the runtime cannot be started.
	pub fn new(storage: Arc<S>) -> Result<Self> {
		let runtime = Builder::new_multi_thread()
			.worker_threads(2)
			.thread_name("linkstore-blocking")
			.enable_all()
			.build()?;

		Ok(Self {
			inner: storage,
			runtime,
		})
	}

	/// The wrapped async storage.
	pub fn inner(&self) -> &Arc<S> {
		&self.inner
	}

	pub fn name(&self) -> &str {
		self.inner.name()
	}

	/// Store the content of a reader.
	pub fn store(&self, path: &str, mut content: impl Read, overwrite: bool) -> Result<String> {
		let mut buffer = Vec::new();
		content.read_to_end(&mut buffer)?;
		let stream: ByteStream = byte_stream(buffer);
		self.runtime.block_on(self.inner.store(path, stream, overwrite))
	}

	pub fn store_bytes(
		&self,
		path: &str,
		content: impl Into<Bytes>,
		overwrite: bool,
	) -> Result<String> {
		self.runtime
			.block_on(self.inner.store_bytes(path, content.into(), overwrite))
	}

	/// Open an object for reading.
	///
	/// The returned reader pulls from the backend stream on this wrapper's
	/// runtime and releases it when dropped.
	pub fn read(&self, path: &str) -> Result<SyncIoBridge<ByteStream>> {
		let stream = self.runtime.block_on(self.inner.read(path))?;
		Ok(SyncIoBridge::new_with_handle(
			stream,
			self.runtime.handle().clone(),
		))
	}

	pub fn read_bytes(&self, path: &str) -> Result<Bytes> {
		self.runtime.block_on(self.inner.read_bytes(path))
	}

	pub fn exists(&self, path: &str) -> Result<bool> {
		self.runtime.block_on(self.inner.exists(path))
	}

	pub fn absolute_path(&self, path: &str) -> Result<String> {
		self.runtime.block_on(self.inner.absolute_path(path))
	}
}

impl<S: ObjectStorage + ?Sized> BlockingStorage<S> {
	pub fn list_objects(
		&self,
		page_size: usize,
		marker: Option<&str>,
		prefix: &str,
	) -> Result<BucketListing> {
		self.runtime
			.block_on(self.inner.list_objects(page_size, marker, prefix))
	}

	pub fn create_upload_ticket(
		&self,
		allowed_prefix_or_name: &str,
		ttl: Duration,
	) -> Result<UploadTicket> {
		self.runtime
			.block_on(self.inner.create_upload_ticket(allowed_prefix_or_name, ttl))
	}
}

impl<S: Storage + ?Sized> std::fmt::Debug for BlockingStorage<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BlockingStorage")
			.field("name", &self.inner.name())
			.finish()
	}
}
