//! Test data loader helper.
//!
//! Provides convenient methods for locating and reading fixture files.

use std::path::{Path, PathBuf};

/// Test data loader for fixture files.
///
/// Resolves names against the `tests/fixtures/data` directory of this crate,
/// independent of the working directory the tests run from.
pub struct TestDataLoader {
	base_path: PathBuf,
}

impl TestDataLoader {
	/// Create a new test data loader.
	///
	/// Uses the default test fixtures data directory.
	pub fn new() -> Self {
		Self {
			base_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/data"),
		}
	}

	/// Create a test data loader with a custom base path.
	pub fn with_base<P: AsRef<Path>>(base_path: P) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
		}
	}

	/// The directory fixture names are resolved against.
	pub fn base(&self) -> &Path {
		&self.base_path
	}

	/// Load JSON test data by name (without the .json extension).
	///
	/// # Panics
	///
	/// Panics if the file cannot be read.
	pub fn load_json(&self, name: &str) -> String {
		let path = self.base_path.join(format!("{}.json", name));
		std::fs::read_to_string(&path)
			.unwrap_or_else(|_| panic!("Failed to load test data: {:?}", path))
	}

	/// Get the full path to a test data file (with extension).
	pub fn path(&self, name: &str) -> PathBuf {
		self.base_path.join(name)
	}

	/// Check if a test data file exists.
	pub fn exists(&self, name: &str) -> bool {
		self.path(name).exists()
	}
}

impl Default for TestDataLoader {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[rstest::rstest]
	fn test_test_data_loader_creation() {
		let loader = TestDataLoader::new();
		assert!(loader.base().is_absolute());
		assert!(loader.base().ends_with("tests/fixtures/data"));
	}

	#[rstest::rstest]
	fn test_test_data_loader_with_base() {
		let loader = TestDataLoader::with_base("/custom/path");
		assert_eq!(loader.base(), Path::new("/custom/path"));
	}

	#[rstest::rstest]
	fn test_test_data_loader_path() {
		let loader = TestDataLoader::new();
		assert!(loader.exists("sequence.json"));
		assert!(!loader.exists("missing.json"));
	}
}
