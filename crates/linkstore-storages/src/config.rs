//! Configuration types for storage backends.

use crate::registry::registry_key;
use crate::{Result, StorageError};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Storage backend type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendType {
	/// S3-compatible object storage
	S3,
	/// Local file system
	Local,
	/// In-memory object storage
	Memory,
}

impl std::fmt::Display for BackendType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			BackendType::S3 => write!(f, "S3"),
			BackendType::Local => write!(f, "Local"),
			BackendType::Memory => write!(f, "Memory"),
		}
	}
}

impl FromStr for BackendType {
	type Err = StorageError;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_lowercase().as_str() {
			"s3" => Ok(BackendType::S3),
			"local" => Ok(BackendType::Local),
			"memory" => Ok(BackendType::Memory),
			_ => Err(StorageError::ConfigError(format!(
				"Invalid backend type: {}",
				s
			))),
		}
	}
}

/// Configuration for S3-compatible storage backends.
#[cfg(feature = "s3")]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Config {
	/// Bucket name
	pub bucket: String,
	/// Region (e.g., "us-east-1")
	#[serde(default)]
	pub region: Option<String>,
	/// Custom endpoint URL (for LocalStack, MinIO or another S3-compatible provider)
	#[serde(default)]
	pub endpoint: Option<String>,
	/// Key prefix for all objects
	#[serde(default)]
	pub prefix: Option<String>,
	/// Base URL objects are publicly reachable under
	#[serde(default)]
	pub public_base_url: Option<String>,
	/// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
	#[serde(default)]
	pub force_path_style: bool,
	/// Backend name, defaults to "s3"
	#[serde(default)]
	pub name: Option<String>,
}

/// Configuration for local file system backend.
#[cfg(feature = "local")]
#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
	/// Base directory path for file storage
	pub base_path: String,
	/// Create the base directory if it does not exist
	#[serde(default = "default_true")]
	pub create_if_missing: bool,
	/// Backend name, defaults to "local"
	#[serde(default)]
	pub name: Option<String>,
}

#[cfg(feature = "local")]
impl LocalConfig {
	pub fn new(base_path: impl Into<String>) -> Self {
		Self {
			base_path: base_path.into(),
			create_if_missing: true,
			name: None,
		}
	}
}

/// Configuration for the in-memory backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryConfig {
	/// Base URL used for absolute paths, defaults to `memory://<name>`
	#[serde(default)]
	pub public_base_url: Option<String>,
	/// Backend name, defaults to "memory"
	#[serde(default)]
	pub name: Option<String>,
}

#[cfg(feature = "local")]
fn default_true() -> bool {
	true
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
	#[cfg(feature = "s3")]
	S3(S3Config),
	#[cfg(feature = "local")]
	Local(LocalConfig),
	Memory(MemoryConfig),
}

impl StorageConfig {
	/// Backend type of this configuration.
	pub fn backend_type(&self) -> BackendType {
		match self {
			#[cfg(feature = "s3")]
			StorageConfig::S3(_) => BackendType::S3,
			#[cfg(feature = "local")]
			StorageConfig::Local(_) => BackendType::Local,
			StorageConfig::Memory(_) => BackendType::Memory,
		}
	}

	/// Override the backend name.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		let name = Some(name.into());
		match &mut self {
			#[cfg(feature = "s3")]
			StorageConfig::S3(config) => config.name = name,
			#[cfg(feature = "local")]
			StorageConfig::Local(config) => config.name = name,
			StorageConfig::Memory(config) => config.name = name,
		}
		self
	}

	/// Load configuration from environment variables.
	///
	/// # Environment Variables
	///
	/// - `STORAGE_BACKEND`: Backend type ("s3", "local", "memory")
	///
	/// ## S3 Backend
	/// - `S3_BUCKET`: Bucket name (required)
	/// - `S3_REGION`: Region (optional)
	/// - `S3_ENDPOINT`: Custom endpoint URL (optional)
	/// - `S3_PREFIX`: Key prefix (optional)
	/// - `S3_PUBLIC_URL`: Public base URL (optional)
	///
	/// ## Local Backend
	/// - `LOCAL_BASE_PATH`: Base directory path (required)
	pub fn from_env() -> Result<Self> {
		let backend_type = env::var("STORAGE_BACKEND").map_err(|_| {
			StorageError::ConfigError("STORAGE_BACKEND environment variable not set".to_string())
		})?;

		let backend_type = backend_type.parse::<BackendType>()?;

		match backend_type {
			#[cfg(feature = "s3")]
			BackendType::S3 => {
				let bucket = env::var("S3_BUCKET").map_err(|_| {
					StorageError::ConfigError("S3_BUCKET environment variable not set".to_string())
				})?;
				let endpoint = env::var("S3_ENDPOINT").ok();

				Ok(StorageConfig::S3(S3Config {
					bucket,
					region: env::var("S3_REGION").ok(),
					force_path_style: endpoint.is_some(),
					endpoint,
					prefix: env::var("S3_PREFIX").ok(),
					public_base_url: env::var("S3_PUBLIC_URL").ok(),
					name: None,
				}))
			}
			#[cfg(feature = "local")]
			BackendType::Local => {
				let base_path = env::var("LOCAL_BASE_PATH").map_err(|_| {
					StorageError::ConfigError(
						"LOCAL_BASE_PATH environment variable not set".to_string(),
					)
				})?;

				Ok(StorageConfig::Local(LocalConfig::new(base_path)))
			}
			BackendType::Memory => Ok(StorageConfig::Memory(MemoryConfig::default())),
			#[allow(unreachable_patterns)]
			_ => Err(StorageError::ConfigError(format!(
				"Backend type not enabled: {:?}",
				backend_type
			))),
		}
	}
}

/// A backend configuration with the name it is registered under.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedStorageConfig {
	pub name: String,
	#[serde(flatten)]
	pub config: StorageConfig,
}

/// Reference from a linked storage to a named backend.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkedMemberConfig {
	pub name: String,
	/// Whether this member's store result is returned to callers
	#[serde(default)]
	pub authoritative: bool,
}

/// Replication settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkedConfig {
	/// Name the linked storage is registered under
	#[serde(default = "default_linked_name")]
	pub name: String,
	/// Members in write and lookup order
	pub members: Vec<LinkedMemberConfig>,
	/// Per-member call timeout in seconds
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

impl LinkedConfig {
	pub fn timeout(&self) -> Option<Duration> {
		self.timeout_secs.map(Duration::from_secs)
	}
}

fn default_linked_name() -> String {
	"linked".to_string()
}

/// Complete storage settings, usually loaded from a TOML file.
///
/// ```toml
/// [[storages]]
/// name = "disk"
/// backend = "local"
/// base_path = "/var/lib/app/uploads"
///
/// [[storages]]
/// name = "oss"
/// backend = "s3"
/// bucket = "uploads"
/// endpoint = "https://oss-cn-hangzhou.aliyuncs.com"
///
/// [linked]
/// name = "replicated"
/// timeout_secs = 30
/// members = [{ name = "disk" }, { name = "oss", authoritative = true }]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSettings {
	#[serde(default)]
	pub storages: Vec<NamedStorageConfig>,
	#[serde(default)]
	pub linked: Option<LinkedConfig>,
}

impl StorageSettings {
	/// Parse and validate settings from a TOML string.
	pub fn from_toml_str(source: &str) -> Result<Self> {
		let settings: StorageSettings = toml::from_str(source)
			.map_err(|e| StorageError::ConfigError(format!("Invalid storage settings: {}", e)))?;
		settings.validate()?;
		Ok(settings)
	}

	/// Read, parse and validate settings from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|e| {
			StorageError::ConfigError(format!(
				"Failed to read storage settings {}: {}",
				path.display(),
				e
			))
		})?;
		Self::from_toml_str(&source)
	}

	/// Check names are unique and linked members refer to declared storages.
	pub fn validate(&self) -> Result<()> {
		let mut names = HashSet::new();
		for entry in &self.storages {
			let key = registry_key(&entry.name);
			if key.is_empty() {
				return Err(StorageError::ConfigError(
					"Storage name must not be empty".to_string(),
				));
			}
			if !names.insert(key) {
				return Err(StorageError::ConfigError(format!(
					"Duplicate storage name: {}",
					entry.name
				)));
			}
		}

		let Some(linked) = &self.linked else {
			return Ok(());
		};

		if registry_key(&linked.name).is_empty() {
			return Err(StorageError::ConfigError(
				"Linked storage name must not be empty".to_string(),
			));
		}
		if names.contains(&registry_key(&linked.name)) {
			return Err(StorageError::ConfigError(format!(
				"Linked storage name collides with a storage: {}",
				linked.name
			)));
		}
		if linked.members.is_empty() {
			return Err(StorageError::ConfigError(
				"Linked storage needs at least one member".to_string(),
			));
		}
		for member in &linked.members {
			if !names.contains(&registry_key(&member.name)) {
				return Err(StorageError::ConfigError(format!(
					"Linked member refers to unknown storage: {}",
					member.name
				)));
			}
		}
		if linked.members.iter().filter(|m| m.authoritative).count() > 1 {
			return Err(StorageError::ConfigError(
				"At most one linked member can be authoritative".to_string(),
			));
		}
		if linked.timeout_secs == Some(0) {
			return Err(StorageError::ConfigError(
				"Linked timeout must be greater than zero".to_string(),
			));
		}

		Ok(())
	}
}
