//! Fixture parsing functionality.
//!
//! This module reads fixture files and strings through a [`FormatRegistry`]
//! and checks the structural shape of every record.

use std::path::Path;

use super::{FixtureData, FormatRegistry, SerializationFormat};
use crate::error::{FixtureError, FixtureResult};

/// Parser for fixture files.
///
/// The format is picked from the file extension, or given explicitly.
#[derive(Debug, Default, Clone)]
pub struct FixtureParser {
	formats: FormatRegistry,
}

impl FixtureParser {
	/// Creates a parser knowing the default formats.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a parser using a custom format registry.
	pub fn with_formats(formats: FormatRegistry) -> Self {
		Self { formats }
	}

	/// Returns the format registry.
	pub fn formats(&self) -> &FormatRegistry {
		&self.formats
	}

	/// Parses a fixture file from the given path.
	///
	/// The format is detected from the file extension.
	///
	/// # Errors
	///
	/// Returns an error if:
	/// - The file extension is missing or not a registered format
	/// - The file cannot be read
	/// - The file content is invalid
	pub fn parse_file(&self, path: &Path) -> FixtureResult<FixtureData> {
		let format = self.formats.for_path(path)?.ok_or_else(|| {
			FixtureError::UnsupportedFormat("(none)".to_string())
		})?;
		self.parse_file_as(path, format.as_ref())
	}

	/// Parses a fixture file with an explicit format.
	pub fn parse_file_as(
		&self,
		path: &Path,
		format: &dyn SerializationFormat,
	) -> FixtureResult<FixtureData> {
		let content = std::fs::read_to_string(path).map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				FixtureError::FileNotFound(path.display().to_string())
			} else {
				FixtureError::Io(e)
			}
		})?;

		let data = self.parse_with(&content, format)?;
		Ok(data.with_source(path.display().to_string()))
	}

	/// Parses fixture data from a string in the named format.
	///
	/// # Example
	///
	/// ```
	/// # use reinhardt_fixtures::fixtures::FixtureParser;
	/// let parser = FixtureParser::new();
	/// let data = parser
	///     .parse_string(r#"[{"model": "auth.User", "pk": 1, "fields": {}}]"#, "json")
	///     .unwrap();
	/// assert_eq!(data.len(), 1);
	/// ```
	pub fn parse_string(&self, content: &str, format: &str) -> FixtureResult<FixtureData> {
		let format = self.formats.get(format)?;
		self.parse_with(content, format.as_ref())
	}

	fn parse_with(
		&self,
		content: &str,
		format: &dyn SerializationFormat,
	) -> FixtureResult<FixtureData> {
		let records = format.parse(content)?;
		for record in &records {
			record.validate()?;
		}
		Ok(FixtureData::from_records(records, format.name()))
	}
}
