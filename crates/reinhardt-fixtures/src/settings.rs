//! Fixture settings.
//!
//! Settings can be built in code or read from a TOML file:
//!
//! ```toml
//! fixture_dirs = ["fixtures", "/srv/shared/fixtures"]
//! default_format = "json"
//! indent = 2
//! use_transaction = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FixtureError, FixtureResult};

/// Settings shared by the load and dump commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureSettings {
	/// Directories searched for named fixtures, in order.
	pub fixture_dirs: Vec<PathBuf>,

	/// Format used by dumps when none is given.
	#[serde(default = "default_format")]
	pub default_format: String,

	/// Indentation of dump output. 0 produces compact output.
	pub indent: usize,

	/// Load each fixture inside its own transaction.
	#[serde(default = "default_true")]
	pub use_transaction: bool,
}

fn default_format() -> String {
	"json".to_string()
}

fn default_true() -> bool {
	true
}

impl Default for FixtureSettings {
	fn default() -> Self {
		Self {
			fixture_dirs: Vec::new(),
			default_format: default_format(),
			indent: 0,
			use_transaction: true,
		}
	}
}

impl FixtureSettings {
	/// Creates default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Load settings from a TOML file.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::FileNotFound`] if the file does not exist and
	/// [`FixtureError::Settings`] if it cannot be parsed.
	pub fn from_file(path: impl AsRef<Path>) -> FixtureResult<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				FixtureError::FileNotFound(path.display().to_string())
			} else {
				FixtureError::Io(e)
			}
		})?;

		Self::from_toml(&content)
	}

	/// Parse settings from a TOML string.
	pub fn from_toml(content: &str) -> FixtureResult<Self> {
		Ok(toml::from_str(content)?)
	}

	/// Adds a fixture directory.
	pub fn with_fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.fixture_dirs.push(dir.into());
		self
	}

	/// Sets the default dump format.
	pub fn with_default_format(mut self, format: impl Into<String>) -> Self {
		self.default_format = format.into();
		self
	}

	/// Sets the dump indentation.
	pub fn with_indent(mut self, indent: usize) -> Self {
		self.indent = indent;
		self
	}

	/// Sets whether loads run inside transactions.
	pub fn with_transaction(mut self, use_transaction: bool) -> Self {
		self.use_transaction = use_transaction;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[rstest]
	fn test_defaults() {
		let settings = FixtureSettings::default();
		assert!(settings.fixture_dirs.is_empty());
		assert_eq!(settings.default_format, "json");
		assert_eq!(settings.indent, 0);
		assert!(settings.use_transaction);
	}

	#[rstest]
	fn test_parse_toml_partial() {
		let settings = FixtureSettings::from_toml(
			r#"
			fixture_dirs = ["fixtures", "/srv/fixtures"]
			indent = 4
			"#,
		)
		.unwrap();

		assert_eq!(
			settings.fixture_dirs,
			vec![PathBuf::from("fixtures"), PathBuf::from("/srv/fixtures")]
		);
		assert_eq!(settings.indent, 4);
		assert_eq!(settings.default_format, "json");
		assert!(settings.use_transaction);
	}

	#[rstest]
	fn test_parse_toml_invalid() {
		let result = FixtureSettings::from_toml("indent = \"wide\"");
		assert!(matches!(result, Err(FixtureError::Settings(_))));
	}

	#[rstest]
	fn test_from_file() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "default_format = \"yaml\"\nuse_transaction = false").unwrap();

		let settings = FixtureSettings::from_file(file.path()).unwrap();
		assert_eq!(settings.default_format, "yaml");
		assert!(!settings.use_transaction);
	}

	#[rstest]
	fn test_builder() {
		let settings = FixtureSettings::new()
			.with_fixture_dir("fixtures")
			.with_default_format("yaml")
			.with_indent(2)
			.with_transaction(false);

		assert_eq!(settings.fixture_dirs, vec![PathBuf::from("fixtures")]);
		assert_eq!(settings.default_format, "yaml");
		assert_eq!(settings.indent, 2);
		assert!(!settings.use_transaction);
	}
}
