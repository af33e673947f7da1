//! Object key normalisation shared by all backends.
//!
//! Keys are logical, slash-separated paths. A leading `/` carries no meaning,
//! so `"/a/b.txt"` and `"a/b.txt"` address the same object on every backend.

use crate::{Result, StorageError};

/// Normalise a logical object key.
///
/// Leading separators are stripped, backslashes are treated as separators and
/// repeated separators are collapsed. Empty keys, NUL bytes and `.`/`..`
/// segments are rejected so that no key can escape a backend's namespace.
///
/// # Examples
///
/// ```
/// use linkstore_storages::path::normalize_key;
///
/// assert_eq!(normalize_key("/a/b.txt").unwrap(), "a/b.txt");
/// assert_eq!(normalize_key("a//b.txt").unwrap(), "a/b.txt");
/// assert!(normalize_key("../etc/passwd").is_err());
/// ```
pub fn normalize_key(path: &str) -> Result<String> {
	if path.contains('\0') {
		return Err(StorageError::InvalidPath(format!(
			"key contains a NUL byte: {:?}",
			path
		)));
	}

	let mut segments = Vec::new();
	for segment in path.split(['/', '\\']) {
		match segment {
			"" => continue,
			"." | ".." => {
				return Err(StorageError::InvalidPath(format!(
					"relative segment in key: {}",
					path
				)));
			}
			s => segments.push(s),
		}
	}

	if segments.is_empty() {
		return Err(StorageError::InvalidPath(format!("empty key: {:?}", path)));
	}

	Ok(segments.join("/"))
}

/// Normalise a listing prefix.
///
/// Unlike [`normalize_key`], an empty prefix is valid (it selects everything)
/// and a trailing separator is preserved because it is significant for
/// delimiter-based listings.
pub fn normalize_prefix(prefix: &str) -> Result<String> {
	let trimmed = prefix.trim_start_matches(['/', '\\']);
	if trimmed.is_empty() {
		return Ok(String::new());
	}

	let mut key = normalize_key(trimmed)?;
	if trimmed.ends_with(['/', '\\']) {
		key.push('/');
	}
	Ok(key)
}

/// Join a configured namespace prefix and a normalised key.
#[cfg(feature = "s3")]
pub(crate) fn join_prefix(prefix: Option<&str>, key: &str) -> String {
	match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
		Some(prefix) => format!("{}/{}", prefix, key),
		None => key.to_string(),
	}
}
