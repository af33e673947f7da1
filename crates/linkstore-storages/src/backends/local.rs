//! Local file system storage backend implementation.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::backend::ByteStream;
use crate::config::LocalConfig;
use crate::path::normalize_key;
use crate::{Result, Storage, StorageError};

/// Local file system storage backend.
///
/// Objects are files below a base directory. Writes go to a hidden temporary
/// file next to the target and are moved into place afterwards, so readers
/// never observe a partially written object.
#[derive(Debug, Clone)]
pub struct LocalStorage {
	name: String,
	base_path: PathBuf,
}

impl LocalStorage {
	/// Create a new local storage backend.
	///
	/// # Arguments
	///
	/// * `config` - Local storage configuration
	///
	/// # Errors
	///
	/// Returns `` `StorageError::ConfigError` `` if the base path is invalid, or
	/// does not exist and `create_if_missing` is off.
	pub fn new(config: LocalConfig) -> Result<Self> {
		if config.base_path.trim().is_empty() {
			return Err(StorageError::ConfigError(
				"Base path must not be empty".to_string(),
			));
		}

		let base_path = PathBuf::from(config.base_path);

		if !base_path.exists() {
			if !config.create_if_missing {
				return Err(StorageError::ConfigError(format!(
					"Base path does not exist: {}",
					base_path.display()
				)));
			}
			std::fs::create_dir_all(&base_path).map_err(|e| {
				StorageError::ConfigError(format!(
					"Failed to create base path {}: {}",
					base_path.display(),
					e
				))
			})?;
		}

		if !base_path.is_dir() {
			return Err(StorageError::ConfigError(format!(
				"Base path is not a directory: {}",
				base_path.display()
			)));
		}

		Ok(Self {
			name: config.name.unwrap_or_else(|| "local".to_string()),
			base_path,
		})
	}

	/// Base directory of this storage.
	pub fn base_path(&self) -> &Path {
		&self.base_path
	}

	/// Whether an I/O error means "nothing at this path".
	///
	/// A key below an existing file (`a.txt/b`) reports `NotADirectory`.
	fn is_absent(error: &std::io::Error) -> bool {
		matches!(error.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
	}

	/// Get the normalised key and full file path.
	fn get_path(&self, name: &str) -> Result<(String, PathBuf)> {
		let key = normalize_key(name)?;
		let path = self.base_path.join(&key);
		Ok((key, path))
	}

	async fn write_temp(temp_path: &Path, mut content: ByteStream) -> Result<()> {
		let mut file = fs::File::create(temp_path).await?;
		tokio::io::copy(&mut content, &mut file).await?;
		file.flush().await?;
		file.sync_all().await?;
		Ok(())
	}

	async fn commit(temp_path: &Path, path: &Path, key: &str, overwrite: bool) -> Result<()> {
		if overwrite {
			fs::rename(temp_path, path).await?;
			return Ok(());
		}

		// hard_link refuses to replace an existing file, which makes the
		// no-overwrite case a single atomic create
		let linked = fs::hard_link(temp_path, path).await;
		fs::remove_file(temp_path).await.ok();
		match linked {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::AlreadyExists => {
				Err(StorageError::AlreadyExists(key.to_string()))
			}
			Err(e) => Err(e.into()),
		}
	}
}

#[async_trait]
impl Storage for LocalStorage {
	fn name(&self) -> &str {
		&self.name
	}

	async fn store(&self, name: &str, content: ByteStream, overwrite: bool) -> Result<String> {
		let (key, path) = self.get_path(name)?;

		if !overwrite {
			match fs::try_exists(&path).await {
				Ok(true) => return Err(StorageError::AlreadyExists(key)),
				Ok(false) => {}
				Err(e) if Self::is_absent(&e) => {}
				Err(e) => return Err(e.into()),
			}
		}

		// Create parent directories if they don't exist
		let parent = path.parent().unwrap_or(&self.base_path);
		fs::create_dir_all(parent).await?;

		// Fixed-length name, so any legal target name also fits as a temp file
		let temp_path = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));

		if let Err(e) = Self::write_temp(&temp_path, content).await {
			fs::remove_file(&temp_path).await.ok();
			return Err(e);
		}
		if let Err(e) = Self::commit(&temp_path, &path, &key, overwrite).await {
			fs::remove_file(&temp_path).await.ok();
			return Err(e);
		}

		tracing::debug!(storage = %self.name, key = %key, "stored file");
		Ok(key)
	}

	async fn read(&self, name: &str) -> Result<ByteStream> {
		let (key, path) = self.get_path(name)?;

		match fs::metadata(&path).await {
			Ok(metadata) if metadata.is_file() => {}
			Ok(_) => return Err(StorageError::NotFound(key)),
			Err(e) if Self::is_absent(&e) => return Err(StorageError::NotFound(key)),
			Err(e) => return Err(e.into()),
		}

		match fs::File::open(&path).await {
			Ok(file) => Ok(Box::pin(file)),
			Err(e) if Self::is_absent(&e) => Err(StorageError::NotFound(key)),
			Err(e) => Err(e.into()),
		}
	}

	async fn exists(&self, name: &str) -> Result<bool> {
		let (_, path) = self.get_path(name)?;

		match fs::metadata(&path).await {
			Ok(metadata) => Ok(metadata.is_file()),
			Err(e) if Self::is_absent(&e) => Ok(false),
			Err(e) => Err(e.into()),
		}
	}

	async fn absolute_path(&self, name: &str) -> Result<String> {
		let (key, path) = self.get_path(name)?;

		if !self.exists(&key).await? {
			return Err(StorageError::NotFound(key));
		}

		let abs_path = fs::canonicalize(&path).await?;
		Ok(abs_path.display().to_string())
	}
}
