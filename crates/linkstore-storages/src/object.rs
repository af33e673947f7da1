//! Extension contract for remote object stores.

use crate::{Result, Storage, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// A file entry in a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedFile {
	/// Object key
	pub key: String,
	/// Size in bytes
	pub size: u64,
}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BucketListing {
	/// Objects directly below the requested prefix
	pub files: Vec<ListedFile>,
	/// Common prefixes ("directories"), each ending with `/`
	pub directories: Vec<String>,
	/// Cursor for the next page; `None` once the listing is complete
	pub next_marker: Option<String>,
}

impl BucketListing {
	/// Whether this is the last page.
	pub fn is_complete(&self) -> bool {
		self.next_marker.is_none()
	}

	/// Number of entries (files and directories) on this page.
	pub fn len(&self) -> usize {
		self.files.len() + self.directories.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Time-limited credential allowing a third party to upload directly.
///
/// A ticket never carries the backend's long-lived secret, only a derived,
/// scoped, expiring signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadTicket {
	/// Signed URL to upload to
	pub url: String,
	/// HTTP method the URL is signed for
	pub method: String,
	/// Headers the client must send with the upload
	pub headers: Vec<(String, String)>,
	/// Key or key prefix the ticket is valid for
	pub scope: String,
	/// Expiry instant
	pub expires_at: DateTime<Utc>,
}

impl UploadTicket {
	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		now >= self.expires_at
	}
}

/// Capabilities only meaningful for remote object stores.
#[async_trait]
pub trait ObjectStorage: Storage {
	/// List objects below `prefix`, one page at a time.
	///
	/// # Arguments
	///
	/// * `page_size` - Upper bound on entries (files plus directories) returned
	/// * `marker` - `next_marker` of the previous page, or `None` to start over
	/// * `prefix` - Key prefix to list under
	///
	/// Chaining `next_marker` visits every entry exactly once, provided the
	/// namespace is not modified concurrently.
	async fn list_objects(
		&self,
		page_size: usize,
		marker: Option<&str>,
		prefix: &str,
	) -> Result<BucketListing>;

	/// Issue a time-limited upload credential for a key or key prefix.
	///
	/// # Errors
	///
	/// Returns `` `StorageError::InvalidArgument` `` if `ttl` is zero or above
	/// the backend's maximum.
	async fn create_upload_ticket(
		&self,
		allowed_prefix_or_name: &str,
		ttl: Duration,
	) -> Result<UploadTicket>;
}

/// Bucket administration for an object store account.
///
/// A manager hands out one [`ObjectStorage`] per bucket.
#[async_trait]
pub trait ObjectStorageManager: Send + Sync {
	/// Create a bucket.
	///
	/// # Errors
	///
	/// Returns `` `StorageError::BucketAlreadyExists` `` if the bucket exists and
	/// `` `StorageError::InvalidArgument` `` for a malformed bucket name.
	async fn create_bucket(&self, name: &str) -> Result<()>;

	/// Open a bucket, creating it first when it is missing and `auto_create`
	/// is set.
	///
	/// # Errors
	///
	/// Returns `` `StorageError::BucketNotFound` `` if the bucket is missing and
	/// `auto_create` is off.
	async fn bucket(&self, name: &str, auto_create: bool) -> Result<Arc<dyn ObjectStorage>>;
}

/// Validate a bucket name against the S3 naming rules: 3 to 63 characters of
/// lowercase letters, digits, `.` and `-`, starting and ending alphanumeric.
pub(crate) fn check_bucket_name(name: &str) -> Result<()> {
	let valid_chars = name
		.bytes()
		.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-');
	let valid_ends = name.bytes().next().is_some_and(|b| b.is_ascii_alphanumeric())
		&& name.bytes().last().is_some_and(|b| b.is_ascii_alphanumeric());

	if !(3..=63).contains(&name.len()) || !valid_chars || !valid_ends || name.contains("..") {
		return Err(StorageError::InvalidArgument(format!(
			"invalid bucket name: {:?}",
			name
		)));
	}
	Ok(())
}

pub(crate) fn check_page_size(page_size: usize) -> Result<()> {
	if page_size == 0 {
		return Err(StorageError::InvalidArgument(
			"page size must be greater than zero".to_string(),
		));
	}
	Ok(())
}

pub(crate) fn check_ttl(ttl: Duration, max: Duration) -> Result<()> {
	if ttl.is_zero() || ttl > max {
		return Err(StorageError::InvalidArgument(format!(
			"ticket lifetime must be between 1s and {}s, got {:?}",
			max.as_secs(),
			ttl
		)));
	}
	Ok(())
}

/// Treat an empty marker the same as no marker.
pub(crate) fn effective_marker(marker: Option<&str>) -> Option<&str> {
	marker.filter(|m| !m.is_empty())
}
