//! Replicating storage composed of several member backends.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{ByteStream, collect_stream};
use crate::error::MemberFailure;
use crate::path::normalize_key;
use crate::{Result, Storage, StorageError};

/// A backend registered with a [`LinkedStorage`].
#[derive(Clone)]
pub struct LinkedMember {
	storage: Arc<dyn Storage>,
	authoritative: bool,
}

impl LinkedMember {
	pub fn name(&self) -> &str {
		self.storage.name()
	}

	pub fn storage(&self) -> &Arc<dyn Storage> {
		&self.storage
	}

	pub fn is_authoritative(&self) -> bool {
		self.authoritative
	}
}

impl fmt::Debug for LinkedMember {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LinkedMember")
			.field("name", &self.name())
			.field("authoritative", &self.authoritative)
			.finish()
	}
}

/// Storage that replicates writes to every member and reads from the first
/// member holding the object.
///
/// - `store` sends the same content to all members concurrently. It succeeds
///   only if every member succeeds; otherwise the error lists each failed
///   member. Members that did succeed keep the object.
/// - `exists` asks all members concurrently and is true only if all say so.
/// - `read` and `absolute_path` check members in registration order and use
///   the first one that has the object.
///
/// The value returned on success comes from the authoritative member, or
/// from the first member when none is marked.
///
/// # Examples
///
/// ```rust
/// use linkstore_storages::{LinkedStorage, MemoryStorage, Storage};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> linkstore_storages::Result<()> {
/// let primary = Arc::new(MemoryStorage::new("primary"));
/// let replica = Arc::new(MemoryStorage::new("replica"));
///
/// let linked = LinkedStorage::new()
///     .with_storage(primary.clone(), true)?
///     .with_storage(replica.clone(), false)?;
///
/// linked.store_bytes("a/b.txt", vec![1, 2, 3].into(), true).await?;
///
/// assert!(primary.exists("a/b.txt").await?);
/// assert!(replica.exists("a/b.txt").await?);
/// assert_eq!(&linked.read_bytes("a/b.txt").await?[..], &[1, 2, 3]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LinkedStorage {
	name: String,
	members: Vec<LinkedMember>,
	authoritative: Option<usize>,
	timeout: Option<Duration>,
}

impl LinkedStorage {
	/// Create an empty linked storage named `linked`.
	pub fn new() -> Self {
		Self::named("linked")
	}

	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			members: Vec::new(),
			authoritative: None,
			timeout: None,
		}
	}

	/// Bound every member call by `timeout`.
	///
	/// A member that does not answer in time fails with
	/// `` `StorageError::Timeout` ``.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	/// Append a member.
	///
	/// Members are written and checked in the order they are added.
	///
	/// # Errors
	///
	/// Returns `` `StorageError::ConfigError` `` if `authoritative` is set and
	/// another member is already authoritative.
	pub fn add_storage(
		&mut self,
		storage: Arc<dyn Storage>,
		authoritative: bool,
	) -> Result<&mut Self> {
		if authoritative {
			if let Some(index) = self.authoritative {
				return Err(StorageError::ConfigError(format!(
					"{} already has authoritative member {}, cannot also mark {}",
					self.name,
					self.members[index].name(),
					storage.name()
				)));
			}
			self.authoritative = Some(self.members.len());
		}

		tracing::debug!(
			storage = %self.name,
			member = %storage.name(),
			authoritative,
			"added linked member"
		);
		self.members.push(LinkedMember {
			storage,
			authoritative,
		});
		Ok(self)
	}

	/// Builder form of [`add_storage`](Self::add_storage).
	pub fn with_storage(mut self, storage: Arc<dyn Storage>, authoritative: bool) -> Result<Self> {
		self.add_storage(storage, authoritative)?;
		Ok(self)
	}

	/// Look up a member by name, ignoring case.
	pub fn member(&self, name: &str) -> Option<&Arc<dyn Storage>> {
		let wanted = name.to_lowercase();
		self.members
			.iter()
			.find(|m| m.name().to_lowercase() == wanted)
			.map(LinkedMember::storage)
	}

	pub fn members(&self) -> impl Iterator<Item = &LinkedMember> {
		self.members.iter()
	}

	/// The authoritative member, if one is marked.
	pub fn authoritative(&self) -> Option<&Arc<dyn Storage>> {
		self.authoritative.map(|i| &self.members[i].storage)
	}

	pub fn timeout(&self) -> Option<Duration> {
		self.timeout
	}

	pub fn len(&self) -> usize {
		self.members.len()
	}

	pub fn is_empty(&self) -> bool {
		self.members.is_empty()
	}

	fn ensure_members(&self) -> Result<()> {
		if self.members.is_empty() {
			return Err(StorageError::ConfigError(format!(
				"{} has no member storages",
				self.name
			)));
		}
		Ok(())
	}

	fn primary_index(&self) -> usize {
		self.authoritative.unwrap_or(0)
	}

	/// Collect per-member results, failing if any member failed.
	fn reduce<T>(&self, operation: &'static str, results: Vec<Result<T>>) -> Result<Vec<T>> {
		let total = results.len();
		let mut values = Vec::with_capacity(total);
		let mut failures = Vec::new();

		for (member, result) in self.members.iter().zip(results) {
			match result {
				Ok(value) => values.push(value),
				Err(error) => {
					tracing::warn!(
						storage = %self.name,
						member = %member.name(),
						operation,
						%error,
						"linked member failed"
					);
					failures.push(MemberFailure::new(member.name(), error));
				}
			}
		}

		if failures.is_empty() {
			Ok(values)
		} else {
			Err(StorageError::Aggregate {
				operation,
				total,
				failures,
			})
		}
	}

	/// First member, in registration order, that reports having `key`.
	async fn locate(&self, key: &str) -> Result<&LinkedMember> {
		for member in &self.members {
			match bounded(self.timeout, member.storage.exists(key)).await {
				Ok(true) => {
					tracing::debug!(
						storage = %self.name,
						member = %member.name(),
						key,
						"object located"
					);
					return Ok(member);
				}
				Ok(false) => {}
				Err(error) => {
					tracing::warn!(
						storage = %self.name,
						member = %member.name(),
						key,
						%error,
						"existence check failed, trying next member"
					);
				}
			}
		}

		Err(StorageError::NotFound(key.to_string()))
	}
}

impl Default for LinkedStorage {
	fn default() -> Self {
		Self::new()
	}
}

async fn bounded<T, F>(timeout: Option<Duration>, call: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	match timeout {
		Some(limit) => tokio::time::timeout(limit, call)
			.await
			.unwrap_or(Err(StorageError::Timeout(limit))),
		None => call.await,
	}
}

#[async_trait]
impl Storage for LinkedStorage {
	fn name(&self) -> &str {
		&self.name
	}

	async fn store(&self, path: &str, content: ByteStream, overwrite: bool) -> Result<String> {
		self.ensure_members()?;
		let content = collect_stream(content).await?;
		self.store_bytes(path, content, overwrite).await
	}

	async fn store_bytes(&self, path: &str, content: Bytes, overwrite: bool) -> Result<String> {
		self.ensure_members()?;
		let key = normalize_key(path)?;

		tracing::debug!(
			storage = %self.name,
			key = %key,
			members = self.members.len(),
			"replicating store"
		);
		let calls = self.members.iter().map(|member| {
			bounded(
				self.timeout,
				member.storage.store_bytes(&key, content.clone(), overwrite),
			)
		});
		let results = join_all(calls).await;

		let primary = self.primary_index();
		self.reduce("store", results)?
			.into_iter()
			.nth(primary)
			.ok_or_else(|| StorageError::transport_msg("member result missing"))
	}

	async fn read(&self, path: &str) -> Result<ByteStream> {
		self.ensure_members()?;
		let key = normalize_key(path)?;
		let member = self.locate(&key).await?;
		bounded(self.timeout, member.storage.read(&key)).await
	}

	async fn exists(&self, path: &str) -> Result<bool> {
		self.ensure_members()?;
		let key = normalize_key(path)?;

		let calls = self
			.members
			.iter()
			.map(|member| bounded(self.timeout, member.storage.exists(&key)));
		let results = join_all(calls).await;

		Ok(self.reduce("exists", results)?.into_iter().all(|present| present))
	}

	async fn absolute_path(&self, path: &str) -> Result<String> {
		self.ensure_members()?;
		let key = normalize_key(path)?;
		let member = self.locate(&key).await?;
		bounded(self.timeout, member.storage.absolute_path(&key)).await
	}
}
