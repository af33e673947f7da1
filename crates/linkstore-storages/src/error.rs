//! Error types for storage operations.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Boxed error used as the cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Storage errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
	/// Write refused because the object exists and overwrite is disabled.
	#[error("object already exists: {0}")]
	AlreadyExists(String),

	/// Object not found.
	#[error("object not found: {0}")]
	NotFound(String),

	/// Object-store bucket does not exist.
	#[error("bucket not found: {0}")]
	BucketNotFound(String),

	/// Bucket creation refused because the bucket exists.
	#[error("bucket already exists: {0}")]
	BucketAlreadyExists(String),

	/// No backend registered under the requested name.
	#[error("storage backend not registered: {0}")]
	BackendNotFound(String),

	/// A backend with the same (case-insensitive) name is already registered.
	#[error("storage backend already registered: {0}")]
	AlreadyRegistered(String),

	/// The underlying medium call failed (network, authentication, service error).
	#[error("transport failure: {message}")]
	Transport {
		/// Human readable description.
		message: String,
		/// Underlying cause, if any.
		#[source]
		source: Option<BoxError>,
	},

	/// One or more members of a fan-out failed.
	#[error("{operation} failed on {} of {total} storage members: {}", .failures.len(), MemberFailures(.failures))]
	Aggregate {
		/// Operation name ("store", "exists", ...).
		operation: &'static str,
		/// Number of members the operation was issued to.
		total: usize,
		/// Per-member failure detail, in member order.
		failures: Vec<MemberFailure>,
	},

	/// A member call did not complete within the configured timeout.
	#[error("operation timed out after {0:?}")]
	Timeout(Duration),

	/// The object key cannot be used as a storage path.
	#[error("invalid path: {0}")]
	InvalidPath(String),

	/// An argument is outside the accepted range.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// The backend does not support the requested operation.
	#[error("unsupported operation: {0}")]
	Unsupported(String),

	/// Configuration error.
	#[error("configuration error: {0}")]
	ConfigError(String),

	/// IO error.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Failure of a single member inside a fan-out.
#[derive(Debug)]
pub struct MemberFailure {
	/// Name of the failing member.
	pub member: String,
	/// The error it reported.
	pub error: StorageError,
}

impl MemberFailure {
	pub fn new(member: impl Into<String>, error: StorageError) -> Self {
		Self {
			member: member.into(),
			error,
		}
	}
}

impl fmt::Display for MemberFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}] {}", self.member, self.error)
	}
}

struct MemberFailures<'a>(&'a [MemberFailure]);

impl fmt::Display for MemberFailures<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, failure) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str("; ")?;
			}
			write!(f, "{}", failure)?;
		}
		Ok(())
	}
}

/// Coarse classification of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	AlreadyExists,
	NotFound,
	Transport,
	Aggregate,
	InvalidInput,
	Unsupported,
	Config,
}

impl StorageError {
	/// Build a transport failure wrapping an underlying error.
	pub fn transport<E>(message: impl Into<String>, source: E) -> Self
	where
		E: Into<BoxError>,
	{
		StorageError::Transport {
			message: message.into(),
			source: Some(source.into()),
		}
	}

	/// Build a transport failure without an underlying error.
	pub fn transport_msg(message: impl Into<String>) -> Self {
		StorageError::Transport {
			message: message.into(),
			source: None,
		}
	}

	/// Classify this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			StorageError::AlreadyExists(_) | StorageError::BucketAlreadyExists(_) => {
				ErrorKind::AlreadyExists
			}
			StorageError::NotFound(_)
			| StorageError::BucketNotFound(_)
			| StorageError::BackendNotFound(_) => ErrorKind::NotFound,
			StorageError::Transport { .. } | StorageError::Timeout(_) | StorageError::Io(_) => {
				ErrorKind::Transport
			}
			StorageError::Aggregate { .. } => ErrorKind::Aggregate,
			StorageError::InvalidPath(_) | StorageError::InvalidArgument(_) => {
				ErrorKind::InvalidInput
			}
			StorageError::Unsupported(_) => ErrorKind::Unsupported,
			StorageError::AlreadyRegistered(_) | StorageError::ConfigError(_) => ErrorKind::Config,
		}
	}

	pub fn is_not_found(&self) -> bool {
		self.kind() == ErrorKind::NotFound
	}

	pub fn is_already_exists(&self) -> bool {
		self.kind() == ErrorKind::AlreadyExists
	}

	/// Per-member failures of an aggregate error, empty otherwise.
	pub fn member_failures(&self) -> &[MemberFailure] {
		match self {
			StorageError::Aggregate { failures, .. } => failures,
			_ => &[],
		}
	}
}
