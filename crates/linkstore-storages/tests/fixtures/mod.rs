//! Test fixtures for storage tests.
//!
//! All fixtures are designed to work with rstest and can be composed together.

#![allow(dead_code)]
#![allow(unreachable_pub)]

mod common_fixtures;
#[cfg(feature = "local")]
mod local_fixtures;
mod mock_backends;
#[cfg(feature = "s3")]
mod s3_fixtures;

pub use common_fixtures::*;
#[cfg(feature = "local")]
pub use local_fixtures::*;
pub use mock_backends::*;
#[cfg(feature = "s3")]
pub use s3_fixtures::*;
