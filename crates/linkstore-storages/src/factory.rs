//! Factory functions for creating storage backends.

use crate::config::StorageSettings;
use crate::{
	LinkedStorage, MemoryStorage, ObjectStorage, Result, Storage, StorageConfig, StorageError,
	StorageRegistry,
};
use std::sync::Arc;

/// Create a storage backend from configuration.
///
/// This factory function creates the appropriate storage backend based on
/// the provided configuration.
///
/// # Arguments
///
/// * `config` - Storage configuration
///
/// # Returns
///
/// A shared trait object implementing `` `Storage` ``.
///
/// # Examples
///
/// ```rust,no_run
/// use linkstore_storages::{create_storage, StorageConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = StorageConfig::from_env()?;
///     let storage = create_storage(config).await?;
///     Ok(())
/// }
/// ```
pub async fn create_storage(config: StorageConfig) -> Result<Arc<dyn Storage>> {
	let backend = config.backend_type();
	let storage: Arc<dyn Storage> = match config {
		#[cfg(feature = "s3")]
		StorageConfig::S3(s3_config) => {
			Arc::new(crate::backends::s3::S3Storage::new(s3_config).await?)
		}
		#[cfg(feature = "local")]
		StorageConfig::Local(local_config) => {
			Arc::new(crate::backends::local::LocalStorage::new(local_config)?)
		}
		StorageConfig::Memory(memory_config) => Arc::new(MemoryStorage::from_config(memory_config)),
	};

	tracing::info!(name = %storage.name(), %backend, "created storage backend");
	Ok(storage)
}

/// Create a backend that also supports listing and upload tickets.
///
/// # Errors
///
/// Returns `` `StorageError::Unsupported` `` for the local file system backend.
pub async fn create_object_storage(config: StorageConfig) -> Result<Arc<dyn ObjectStorage>> {
	let backend = config.backend_type();
	let storage: Arc<dyn ObjectStorage> = match config {
		#[cfg(feature = "s3")]
		StorageConfig::S3(s3_config) => {
			Arc::new(crate::backends::s3::S3Storage::new(s3_config).await?)
		}
		StorageConfig::Memory(memory_config) => Arc::new(MemoryStorage::from_config(memory_config)),
		#[allow(unreachable_patterns)]
		_ => {
			return Err(StorageError::Unsupported(format!(
				"{} backend is not an object store",
				backend
			)));
		}
	};

	tracing::info!(name = %storage.name(), %backend, "created object storage backend");
	Ok(storage)
}

/// Build every configured backend and register it by name.
///
/// When the settings contain a `[linked]` table, its members are taken from
/// the backends just built, in declared order, and the resulting
/// [`LinkedStorage`] is registered under the linked name.
///
/// # Examples
///
/// ```rust
/// use linkstore_storages::{Storage, StorageSettings, build_registry};
///
/// # #[tokio::main]
/// # async fn main() -> linkstore_storages::Result<()> {
/// let settings = StorageSettings::from_toml_str(r#"
///     [[storages]]
///     name = "hot"
///     backend = "memory"
///
///     [[storages]]
///     name = "cold"
///     backend = "memory"
///
///     [linked]
///     members = [{ name = "hot", authoritative = true }, { name = "cold" }]
/// "#)?;
///
/// let registry = build_registry(&settings).await?;
/// assert_eq!(registry.names(), vec!["cold", "hot", "linked"]);
///
/// let linked = registry.get("linked")?;
/// linked.store_bytes("a.txt", "hi".into(), true).await?;
/// assert!(registry.get("cold")?.exists("a.txt").await?);
/// # Ok(())
/// # }
/// ```
pub async fn build_registry(settings: &StorageSettings) -> Result<StorageRegistry> {
	settings.validate()?;
	let registry = StorageRegistry::new();

	for entry in &settings.storages {
		let storage = create_storage(entry.config.clone().with_name(entry.name.clone())).await?;
		registry.register(&entry.name, storage)?;
	}

	if let Some(linked_config) = &settings.linked {
		let mut linked = LinkedStorage::named(linked_config.name.clone());
		if let Some(timeout) = linked_config.timeout() {
			linked = linked.with_timeout(timeout);
		}
		for member in &linked_config.members {
			linked.add_storage(registry.get(&member.name)?, member.authoritative)?;
		}

		tracing::info!(
			name = %linked_config.name,
			members = linked.len(),
			"created linked storage"
		);
		registry.register(&linked_config.name, Arc::new(linked))?;
	}

	Ok(registry)
}
