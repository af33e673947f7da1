//! Local storage backend test fixtures.

use linkstore_storages::LocalStorage;
use linkstore_storages::config::LocalConfig;
use rstest::fixture;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Temporary directory with a local backend rooted in it.
///
/// The directory is removed when this value is dropped.
pub struct LocalTestDir {
	temp_dir: TempDir,
	backend: Arc<LocalStorage>,
}

impl LocalTestDir {
	pub fn new() -> Self {
		Self::named("local")
	}

	pub fn named(name: &str) -> Self {
		let temp_dir = TempDir::new().expect("Failed to create temp dir");
		let mut config = LocalConfig::new(temp_dir.path().to_str().unwrap());
		config.name = Some(name.to_string());

		let backend = LocalStorage::new(config).expect("Failed to create local backend");

		Self {
			temp_dir,
			backend: Arc::new(backend),
		}
	}

	pub fn backend(&self) -> Arc<LocalStorage> {
		Arc::clone(&self.backend)
	}

	pub fn path(&self) -> &Path {
		self.temp_dir.path()
	}
}

/// Local test directory fixture.
#[fixture]
pub fn local_temp_dir() -> LocalTestDir {
	LocalTestDir::new()
}
