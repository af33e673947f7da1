//! In-memory object storage backend.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{ByteStream, byte_stream, collect_stream};
use crate::config::MemoryConfig;
use crate::object::{
	BucketListing, ListedFile, ObjectStorage, ObjectStorageManager, UploadTicket,
	check_bucket_name, check_page_size, check_ttl, effective_marker,
};
use crate::path::{normalize_key, normalize_prefix};
use crate::{Result, Storage, StorageError};

type HmacSha256 = Hmac<Sha256>;

const MAX_TICKET_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// In-memory object storage.
///
/// Objects live in a sorted map, so listings come back in key order. Clones
/// share the same objects. Upload tickets are HMAC-SHA256 signatures made with
/// a key generated per instance, and can be checked with
/// [`verify_ticket`](MemoryStorage::verify_ticket).
#[derive(Debug, Clone)]
pub struct MemoryStorage {
	name: String,
	base_url: String,
	objects: Arc<RwLock<BTreeMap<String, Bytes>>>,
	signing_key: Arc<[u8; 32]>,
}

enum Entry {
	File(String, u64),
	Directory(String),
}

impl Entry {
	fn name(&self) -> &str {
		match self {
			Entry::File(key, _) => key,
			Entry::Directory(prefix) => prefix,
		}
	}
}

impl MemoryStorage {
	/// Create an empty storage with the given name.
	pub fn new(name: impl Into<String>) -> Self {
		Self::from_config(MemoryConfig {
			name: Some(name.into()),
			public_base_url: None,
		})
	}

	pub fn from_config(config: MemoryConfig) -> Self {
		let name = config.name.unwrap_or_else(|| "memory".to_string());
		let base_url = config
			.public_base_url
			.unwrap_or_else(|| format!("memory://{}", name))
			.trim_end_matches('/')
			.to_string();

		let mut signing_key = [0u8; 32];
		signing_key[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
		signing_key[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());

		Self {
			name,
			base_url,
			objects: Arc::new(RwLock::new(BTreeMap::new())),
			signing_key: Arc::new(signing_key),
		}
	}

	/// Number of stored objects.
	pub fn len(&self) -> usize {
		self.objects.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.objects.read().is_empty()
	}

	/// Remove an object, returning whether it existed.
	pub fn remove(&self, path: &str) -> Result<bool> {
		let key = normalize_key(path)?;
		Ok(self.objects.write().remove(&key).is_some())
	}

	/// Check that `ticket` was issued by this storage, has not expired and
	/// covers `path`.
	pub fn verify_ticket(&self, ticket: &UploadTicket, path: &str) -> bool {
		let Ok(key) = normalize_key(path) else {
			return false;
		};
		if ticket.is_expired_at(Utc::now()) || !scope_covers(&ticket.scope, &key) {
			return false;
		}

		let Some(signature) = ticket
			.url
			.rsplit_once("signature=")
			.and_then(|(_, signature)| hex::decode(signature).ok())
		else {
			return false;
		};

		self.mac(&ticket.method, &ticket.scope, ticket.expires_at.timestamp())
			.is_ok_and(|mac| mac.verify_slice(&signature).is_ok())
	}

	fn mac(&self, method: &str, scope: &str, expires: i64) -> Result<HmacSha256> {
		let mut mac = HmacSha256::new_from_slice(self.signing_key.as_slice())
			.map_err(|e| StorageError::ConfigError(format!("Invalid signing key: {}", e)))?;
		mac.update(method.as_bytes());
		mac.update(b"\n");
		mac.update(scope.as_bytes());
		mac.update(b"\n");
		mac.update(expires.to_string().as_bytes());
		Ok(mac)
	}

	fn sign(&self, method: &str, scope: &str, expires: i64) -> Result<String> {
		let mac = self.mac(method, scope, expires)?;
		Ok(hex::encode(mac.finalize().into_bytes()))
	}

	fn insert(&self, key: String, content: Bytes, overwrite: bool) -> Result<String> {
		let mut objects = self.objects.write();
		if !overwrite && objects.contains_key(&key) {
			return Err(StorageError::AlreadyExists(key));
		}
		objects.insert(key.clone(), content);
		Ok(key)
	}

	fn entries(&self, prefix: &str) -> Vec<Entry> {
		let objects = self.objects.read();
		let mut entries: Vec<Entry> = Vec::new();

		for (key, content) in objects.range(prefix.to_string()..) {
			if !key.starts_with(prefix) {
				break;
			}
			let rest = &key[prefix.len()..];
			match rest.find('/') {
				Some(i) => {
					let directory = &key[..prefix.len() + i + 1];
					let seen = matches!(entries.last(), Some(Entry::Directory(d)) if d == directory);
					if !seen {
						entries.push(Entry::Directory(directory.to_string()));
					}
				}
				None => entries.push(Entry::File(key.clone(), content.len() as u64)),
			}
		}

		entries
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::from_config(MemoryConfig::default())
	}
}

fn scope_covers(scope: &str, key: &str) -> bool {
	if let Some(prefix) = scope.strip_suffix('*') {
		key.starts_with(prefix)
	} else if scope.ends_with('/') {
		key.starts_with(scope)
	} else {
		scope == key
	}
}

#[async_trait]
impl Storage for MemoryStorage {
	fn name(&self) -> &str {
		&self.name
	}

	async fn store(&self, path: &str, content: ByteStream, overwrite: bool) -> Result<String> {
		let key = normalize_key(path)?;
		let content = collect_stream(content).await?;
		self.insert(key, content, overwrite)
	}

	async fn store_bytes(&self, path: &str, content: Bytes, overwrite: bool) -> Result<String> {
		let key = normalize_key(path)?;
		self.insert(key, content, overwrite)
	}

	async fn read(&self, path: &str) -> Result<ByteStream> {
		let key = normalize_key(path)?;
		let content = self.objects.read().get(&key).cloned();
		match content {
			Some(content) => Ok(byte_stream(content)),
			None => Err(StorageError::NotFound(key)),
		}
	}

	async fn exists(&self, path: &str) -> Result<bool> {
		let key = normalize_key(path)?;
		Ok(self.objects.read().contains_key(&key))
	}

	async fn absolute_path(&self, path: &str) -> Result<String> {
		let key = normalize_key(path)?;
		if !self.objects.read().contains_key(&key) {
			return Err(StorageError::NotFound(key));
		}
		Ok(format!("{}/{}", self.base_url, key))
	}
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
	async fn list_objects(
		&self,
		page_size: usize,
		marker: Option<&str>,
		prefix: &str,
	) -> Result<BucketListing> {
		check_page_size(page_size)?;
		let prefix = normalize_prefix(prefix)?;
		let marker = effective_marker(marker);

		let mut page = self
			.entries(&prefix)
			.into_iter()
			.filter(|entry| marker.is_none_or(|m| entry.name() > m))
			.take(page_size + 1)
			.collect::<Vec<_>>();

		let truncated = page.len() > page_size;
		page.truncate(page_size);

		let mut listing = BucketListing {
			next_marker: if truncated {
				page.last().map(|entry| entry.name().to_string())
			} else {
				None
			},
			..Default::default()
		};
		for entry in page {
			match entry {
				Entry::File(key, size) => listing.files.push(ListedFile { key, size }),
				Entry::Directory(prefix) => listing.directories.push(prefix),
			}
		}

		Ok(listing)
	}

	async fn create_upload_ticket(
		&self,
		allowed_prefix_or_name: &str,
		ttl: Duration,
	) -> Result<UploadTicket> {
		check_ttl(ttl, MAX_TICKET_TTL)?;

		let scope = match allowed_prefix_or_name.strip_suffix('*') {
			Some(prefix) => format!("{}*", normalize_prefix(prefix)?),
			None => normalize_prefix(allowed_prefix_or_name)?,
		};
		if scope.trim_end_matches('*').is_empty() {
			return Err(StorageError::InvalidPath(
				"upload ticket scope must name a key or prefix".to_string(),
			));
		}

		let ttl = chrono::Duration::from_std(ttl)
			.map_err(|e| StorageError::InvalidArgument(format!("Invalid ticket lifetime: {}", e)))?;
		let expires = (Utc::now() + ttl).timestamp();
		let expires_at = DateTime::from_timestamp(expires, 0).ok_or_else(|| {
			StorageError::InvalidArgument(format!("Ticket expiry out of range: {}", expires))
		})?;
		let signature = self.sign("PUT", &scope, expires)?;

		tracing::debug!(storage = %self.name, scope = %scope, "issued upload ticket");

		Ok(UploadTicket {
			url: format!(
				"{}/{}?expires={}&signature={}",
				self.base_url, scope, expires, signature
			),
			method: "PUT".to_string(),
			headers: Vec::new(),
			scope,
			expires_at,
		})
	}
}

/// Bucket manager whose buckets are [`MemoryStorage`] instances named after
/// the bucket. Clones share the same buckets.
#[derive(Debug, Clone, Default)]
pub struct MemoryBucketManager {
	buckets: Arc<RwLock<BTreeMap<String, MemoryStorage>>>,
}

impl MemoryBucketManager {
	pub fn new() -> Self {
		Self::default()
	}

	/// Names of existing buckets, sorted.
	pub fn bucket_names(&self) -> Vec<String> {
		self.buckets.read().keys().cloned().collect()
	}
}

#[async_trait]
impl ObjectStorageManager for MemoryBucketManager {
	async fn create_bucket(&self, name: &str) -> Result<()> {
		check_bucket_name(name)?;

		let mut buckets = self.buckets.write();
		if buckets.contains_key(name) {
			return Err(StorageError::BucketAlreadyExists(name.to_string()));
		}
		buckets.insert(name.to_string(), MemoryStorage::new(name));

		tracing::info!(bucket = %name, "created memory bucket");
		Ok(())
	}

	async fn bucket(&self, name: &str, auto_create: bool) -> Result<Arc<dyn ObjectStorage>> {
		check_bucket_name(name)?;

		let mut buckets = self.buckets.write();
		if let Some(storage) = buckets.get(name) {
			return Ok(Arc::new(storage.clone()));
		}
		if !auto_create {
			return Err(StorageError::BucketNotFound(name.to_string()));
		}

		let storage = MemoryStorage::new(name);
		buckets.insert(name.to_string(), storage.clone());
		tracing::info!(bucket = %name, "created memory bucket on first use");
		Ok(Arc::new(storage))
	}
}
