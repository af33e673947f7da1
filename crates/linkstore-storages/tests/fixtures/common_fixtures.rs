//! Common test fixtures for storage tests.

use crate::utils::{TestFile, create_binary_file, create_text_file, generate_unique_name};
use linkstore_storages::MemoryStorage;
use rstest::fixture;
use std::sync::Arc;

/// Empty file fixture (0 bytes).
#[fixture]
pub fn empty_file() -> TestFile {
	TestFile::new("empty.txt", vec![])
}

/// Small file fixture (< 1KB).
#[fixture]
pub fn small_file() -> TestFile {
	create_text_file("small.txt", 10)
}

/// Large file fixture (around 100KB).
#[fixture]
pub fn large_file() -> TestFile {
	create_text_file("large.txt", 1500)
}

/// Binary file fixture with all byte values.
#[fixture]
pub fn binary_file() -> TestFile {
	create_binary_file("binary.bin")
}

#[fixture]
pub fn unique_file_name() -> String {
	generate_unique_name("test")
}

/// Three independent in-memory members, in registration order.
#[fixture]
pub fn memory_members() -> [Arc<MemoryStorage>; 3] {
	[
		Arc::new(MemoryStorage::new("first")),
		Arc::new(MemoryStorage::new("second")),
		Arc::new(MemoryStorage::new("third")),
	]
}

/// Keys spread over a few directories, for listing tests.
#[fixture]
pub fn listing_keys() -> Vec<String> {
	let mut keys = Vec::new();
	for i in 0..7 {
		keys.push(format!("photos/{:02}.jpg", i));
	}
	for i in 0..5 {
		keys.push(format!("docs/{}.md", i));
	}
	for dir in ["a", "b", "c"] {
		keys.push(format!("nested/{}/leaf.txt", dir));
	}
	for i in 0..4 {
		keys.push(format!("root-{}.txt", i));
	}
	keys
}
