//! Storage backend registry
//!
//! Maps case-insensitive names to shared storage handles.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{Result, Storage, StorageError};

/// Storage backend registry
///
/// Holds already constructed backends under unique, case-insensitive names.
/// A registry is an ordinary value; share it behind an `Arc` to read it from
/// many tasks.
///
/// # Examples
///
/// ```rust
/// use linkstore_storages::{MemoryStorage, Storage, StorageRegistry};
/// use std::sync::Arc;
///
/// let registry = StorageRegistry::new();
/// registry.register("Uploads", Arc::new(MemoryStorage::new("uploads"))).unwrap();
///
/// let storage = registry.get("uploads").unwrap();
/// assert_eq!(storage.name(), "uploads");
/// assert!(registry.register("UPLOADS", Arc::new(MemoryStorage::default())).is_err());
/// ```
#[derive(Default)]
pub struct StorageRegistry {
	backends: RwLock<HashMap<String, Arc<dyn Storage>>>,
}

/// Normalised form names are compared in: trimmed, lowercased.
pub(crate) fn registry_key(name: &str) -> String {
	name.trim().to_lowercase()
}

impl StorageRegistry {
	/// Create a new empty storage registry
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a storage backend
	///
	/// # Arguments
	///
	/// * `name` - Unique name for the storage backend, compared ignoring case
	/// * `storage` - The backend
	///
	/// # Errors
	///
	/// Returns `` `StorageError::AlreadyRegistered` `` if the name is taken and
	/// `` `StorageError::ConfigError` `` if it is blank.
	pub fn register(&self, name: &str, storage: Arc<dyn Storage>) -> Result<()> {
		let key = registry_key(name);
		if key.is_empty() {
			return Err(StorageError::ConfigError(
				"Storage name must not be empty".to_string(),
			));
		}

		let mut backends = self.backends.write();
		if backends.contains_key(&key) {
			return Err(StorageError::AlreadyRegistered(name.to_string()));
		}

		tracing::debug!(name = %key, backend = %storage.name(), "registered storage");
		backends.insert(key, storage);
		Ok(())
	}

	/// Remove a storage backend, returning it.
	///
	/// # Errors
	///
	/// Returns `` `StorageError::BackendNotFound` `` if nothing is registered
	/// under `name`.
	pub fn unregister(&self, name: &str) -> Result<Arc<dyn Storage>> {
		self.backends
			.write()
			.remove(&registry_key(name))
			.ok_or_else(|| StorageError::BackendNotFound(name.to_string()))
	}

	/// Get a storage backend by name
	///
	/// # Errors
	///
	/// Returns `` `StorageError::BackendNotFound` `` if nothing is registered
	/// under `name`.
	pub fn get(&self, name: &str) -> Result<Arc<dyn Storage>> {
		self.backends
			.read()
			.get(&registry_key(name))
			.cloned()
			.ok_or_else(|| StorageError::BackendNotFound(name.to_string()))
	}

	/// Check if a storage backend is registered
	pub fn contains(&self, name: &str) -> bool {
		self.backends.read().contains_key(&registry_key(name))
	}

	/// Registered names (lowercased), sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.backends.read().keys().cloned().collect();
		names.sort();
		names
	}

	pub fn len(&self) -> usize {
		self.backends.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.backends.read().is_empty()
	}
}

impl std::fmt::Debug for StorageRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StorageRegistry")
			.field("names", &self.names())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ErrorKind, MemoryStorage};

	fn memory(name: &str) -> Arc<dyn Storage> {
		Arc::new(MemoryStorage::new(name))
	}

	#[test]
	fn test_registry_creation() {
		let registry = StorageRegistry::new();
		assert!(registry.is_empty());
		assert!(registry.names().is_empty());
	}

	#[test]
	fn test_register_and_get() {
		let registry = StorageRegistry::new();
		let storage = memory("primary");
		registry.register("primary", storage.clone()).unwrap();

		let found = registry.get("primary").unwrap();
		assert!(Arc::ptr_eq(&found, &storage));
		assert!(registry.contains("primary"));
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn test_register_duplicate_fails_ignoring_case() {
		let registry = StorageRegistry::new();
		registry.register("Media", memory("a")).unwrap();

		let result = registry.register("MEDIA", memory("b"));
		assert!(matches!(result, Err(StorageError::AlreadyRegistered(_))));
		assert_eq!(registry.get("media").unwrap().name(), "a");
	}

	#[test]
	fn test_get_unknown_backend() {
		let registry = StorageRegistry::new();
		let error = registry.get("nonexistent").err().expect("expected an error");
		assert!(matches!(error, StorageError::BackendNotFound(_)));
		assert_eq!(error.kind(), ErrorKind::NotFound);
	}

	#[test]
	fn test_blank_name_rejected() {
		let registry = StorageRegistry::new();
		assert!(matches!(
			registry.register("  ", memory("a")),
			Err(StorageError::ConfigError(_))
		));
	}

	#[test]
	fn test_unregister() {
		let registry = StorageRegistry::new();
		registry.register("test", memory("test")).unwrap();

		let removed = registry.unregister("TEST").unwrap();
		assert_eq!(removed.name(), "test");
		assert!(!registry.contains("test"));
		assert!(matches!(
			registry.unregister("test"),
			Err(StorageError::BackendNotFound(_))
		));
	}

	#[test]
	fn test_names_are_sorted() {
		let registry = StorageRegistry::new();
		registry.register("zeta", memory("z")).unwrap();
		registry.register("Alpha", memory("a")).unwrap();
		registry.register("mid", memory("m")).unwrap();

		assert_eq!(registry.names(), vec!["alpha", "mid", "zeta"]);
	}
}
