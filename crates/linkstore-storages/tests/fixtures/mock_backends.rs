//! Hand-written backends for exercising linked storage behaviour.

use async_trait::async_trait;
use linkstore_storages::{ByteStream, Result, Storage, StorageError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Backend whose every call fails with a transport error.
#[derive(Debug)]
pub struct FailingStorage {
	name: String,
}

impl FailingStorage {
	pub fn new(name: &str) -> Arc<Self> {
		Arc::new(Self {
			name: name.to_string(),
		})
	}

	fn failure(&self, operation: &str, path: &str) -> StorageError {
		StorageError::transport_msg(format!(
			"{} unreachable during {} of {}",
			self.name, operation, path
		))
	}
}

#[async_trait]
impl Storage for FailingStorage {
	fn name(&self) -> &str {
		&self.name
	}

	async fn store(&self, path: &str, _content: ByteStream, _overwrite: bool) -> Result<String> {
		Err(self.failure("store", path))
	}

	async fn read(&self, path: &str) -> Result<ByteStream> {
		Err(self.failure("read", path))
	}

	async fn exists(&self, path: &str) -> Result<bool> {
		Err(self.failure("exists", path))
	}

	async fn absolute_path(&self, path: &str) -> Result<String> {
		Err(self.failure("absolute_path", path))
	}
}

/// Per-operation call counts.
#[derive(Debug, Default)]
pub struct CallCounts {
	pub store: AtomicUsize,
	pub read: AtomicUsize,
	pub exists: AtomicUsize,
	pub absolute_path: AtomicUsize,
}

impl CallCounts {
	pub fn total(&self) -> usize {
		self.store.load(Ordering::SeqCst)
			+ self.read.load(Ordering::SeqCst)
			+ self.exists.load(Ordering::SeqCst)
			+ self.absolute_path.load(Ordering::SeqCst)
	}
}

/// Wrapper counting the calls that reach the inner backend.
pub struct CountingStorage {
	inner: Arc<dyn Storage>,
	pub calls: CallCounts,
}

impl CountingStorage {
	pub fn new(inner: Arc<dyn Storage>) -> Arc<Self> {
		Arc::new(Self {
			inner,
			calls: CallCounts::default(),
		})
	}

	pub fn exists_calls(&self) -> usize {
		self.calls.exists.load(Ordering::SeqCst)
	}

	pub fn read_calls(&self) -> usize {
		self.calls.read.load(Ordering::SeqCst)
	}

	pub fn store_calls(&self) -> usize {
		self.calls.store.load(Ordering::SeqCst)
	}

	pub fn total_calls(&self) -> usize {
		self.calls.total()
	}
}

#[async_trait]
impl Storage for CountingStorage {
	fn name(&self) -> &str {
		self.inner.name()
	}

	async fn store(&self, path: &str, content: ByteStream, overwrite: bool) -> Result<String> {
		self.calls.store.fetch_add(1, Ordering::SeqCst);
		self.inner.store(path, content, overwrite).await
	}

	async fn read(&self, path: &str) -> Result<ByteStream> {
		self.calls.read.fetch_add(1, Ordering::SeqCst);
		self.inner.read(path).await
	}

	async fn exists(&self, path: &str) -> Result<bool> {
		self.calls.exists.fetch_add(1, Ordering::SeqCst);
		self.inner.exists(path).await
	}

	async fn absolute_path(&self, path: &str) -> Result<String> {
		self.calls.absolute_path.fetch_add(1, Ordering::SeqCst);
		self.inner.absolute_path(path).await
	}
}

/// Wrapper whose `store` and `exists` wait on a shared barrier before
/// reaching the inner backend, so they only complete once every party's
/// call is in flight at the same time.
pub struct BarrierStorage {
	inner: Arc<dyn Storage>,
	barrier: Arc<tokio::sync::Barrier>,
}

impl BarrierStorage {
	pub fn new(inner: Arc<dyn Storage>, barrier: Arc<tokio::sync::Barrier>) -> Arc<Self> {
		Arc::new(Self { inner, barrier })
	}
}

#[async_trait]
impl Storage for BarrierStorage {
	fn name(&self) -> &str {
		self.inner.name()
	}

	async fn store(&self, path: &str, content: ByteStream, overwrite: bool) -> Result<String> {
		self.barrier.wait().await;
		self.inner.store(path, content, overwrite).await
	}

	async fn read(&self, path: &str) -> Result<ByteStream> {
		self.inner.read(path).await
	}

	async fn exists(&self, path: &str) -> Result<bool> {
		self.barrier.wait().await;
		self.inner.exists(path).await
	}

	async fn absolute_path(&self, path: &str) -> Result<String> {
		self.inner.absolute_path(path).await
	}
}
