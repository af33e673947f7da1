//! Test utilities for storage tests.
//!
//! This module provides test data generation utilities and custom assertions.

#![allow(dead_code)]
#![allow(unreachable_pub)]

use linkstore_storages::{ErrorKind, Result, Storage};
use std::fmt;

// ============================================================================
// Test Data
// ============================================================================

/// Named test payload.
#[derive(Debug, Clone)]
pub struct TestFile {
	pub name: String,
	pub content: Vec<u8>,
}

impl TestFile {
	pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
		Self {
			name: name.into(),
			content,
		}
	}

	pub fn size(&self) -> usize {
		self.content.len()
	}
}

/// Generate text content with specified number of lines.
pub fn generate_text_content(lines: usize) -> String {
	(0..lines)
		.map(|i| format!("Line {}: {}", i, "replicated content ".repeat(4)))
		.collect::<Vec<_>>()
		.join("\n")
}

/// Generate binary content containing all byte values.
pub fn generate_binary_content() -> Vec<u8> {
	(0u8..=255).collect()
}

/// Generate unique file name with prefix.
pub fn generate_unique_name(prefix: &str) -> String {
	format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

/// Generate nested path with specified depth.
pub fn generate_nested_path(depth: usize, file_name: &str) -> String {
	let parts: Vec<String> = (0..depth).map(|i| format!("level{}", i)).collect();
	format!("{}/{}", parts.join("/"), file_name)
}

pub fn create_text_file(name: &str, lines: usize) -> TestFile {
	TestFile::new(name, generate_text_content(lines).into_bytes())
}

pub fn create_binary_file(name: &str) -> TestFile {
	TestFile::new(name, generate_binary_content())
}

// ============================================================================
// Custom Assertions
// ============================================================================

/// Custom assertion error.
#[derive(Debug)]
pub struct AssertionError {
	pub message: String,
}

impl AssertionError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

impl fmt::Display for AssertionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.message)
	}
}

impl std::error::Error for AssertionError {}

/// Assert that an object exists in storage.
pub async fn assert_storage_exists(
	storage: &dyn Storage,
	path: &str,
) -> std::result::Result<(), AssertionError> {
	let exists = storage
		.exists(path)
		.await
		.map_err(|e| AssertionError::new(format!("Failed to check existence: {}", e)))?;

	if !exists {
		return Err(AssertionError::new(format!(
			"{} should hold {}",
			storage.name(),
			path
		)));
	}

	Ok(())
}

/// Assert that an object does NOT exist in storage.
pub async fn assert_storage_not_exists(
	storage: &dyn Storage,
	path: &str,
) -> std::result::Result<(), AssertionError> {
	let exists = storage
		.exists(path)
		.await
		.map_err(|e| AssertionError::new(format!("Failed to check existence: {}", e)))?;

	if exists {
		return Err(AssertionError::new(format!(
			"{} should not hold {}",
			storage.name(),
			path
		)));
	}

	Ok(())
}

/// Assert that object content matches expected value.
pub async fn assert_content_matches(
	storage: &dyn Storage,
	path: &str,
	expected: &[u8],
) -> std::result::Result<(), AssertionError> {
	let actual = storage
		.read_bytes(path)
		.await
		.map_err(|e| AssertionError::new(format!("Failed to read {}: {}", path, e)))?;

	if actual != expected {
		return Err(AssertionError::new(format!(
			"Content mismatch for {} in {} (expected {} bytes, got {} bytes)",
			path,
			storage.name(),
			expected.len(),
			actual.len()
		)));
	}

	Ok(())
}

/// Assert that a result failed with the given error kind.
pub fn assert_error_kind<T: fmt::Debug>(
	result: Result<T>,
	expected: ErrorKind,
) -> std::result::Result<(), AssertionError> {
	match result {
		Err(e) if e.kind() == expected => {
			if e.to_string().is_empty() {
				Err(AssertionError::new("Error should have a message"))
			} else {
				Ok(())
			}
		}
		Err(e) => Err(AssertionError::new(format!(
			"Expected {:?} error, got: {:?}",
			expected, e
		))),
		Ok(value) => Err(AssertionError::new(format!(
			"Expected {:?} error, but operation succeeded with {:?}",
			expected, value
		))),
	}
}

/// Assert that a presigned URL carries an AWS signature.
pub fn assert_presigned_url(url: &str) -> std::result::Result<(), AssertionError> {
	if !url.starts_with("http://") && !url.starts_with("https://") {
		return Err(AssertionError::new(format!(
			"Presigned URL should start with http:// or https://: {}",
			url
		)));
	}

	if !url.contains("X-Amz-Signature") {
		return Err(AssertionError::new(format!(
			"Presigned URL should contain AWS signature params: {}",
			url
		)));
	}

	Ok(())
}
