//! Error types for the fixtures module.
//!
//! This module defines the error types used throughout the reinhardt-fixtures crate.

use thiserror::Error;

/// Errors that can occur while sorting, serializing or loading fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
	/// The dependency resolver could not order the listed models.
	///
	/// Carries the qualified names of every model left unresolved, sorted
	/// ascending.
	#[error("Can't resolve dependencies for {} in serialized app list.", .models.join(", "))]
	CyclicDependency {
		/// Qualified names of the unresolved models.
		models: Vec<String>,
	},

	/// A record names a model that has not been registered.
	#[error("Unknown model: {0}")]
	UnknownType(String),

	/// A natural-key reference could not be resolved against the store.
	#[error(
		"{model}.{field}: no {target} matches natural key {key}{}",
		.record.as_ref().map(|r| format!(" (referenced by {})", r)).unwrap_or_default()
	)]
	DanglingReference {
		/// Model of the referencing record.
		model: String,
		/// Relation field holding the reference.
		field: String,
		/// Model the reference points at.
		target: String,
		/// The natural key that did not match.
		key: String,
		/// Best-effort natural key of the referencing record.
		record: Option<String>,
	},

	/// A record is structurally invalid.
	#[error("Malformed record for {model}: {message}")]
	MalformedRecord {
		/// Model identifier as it appeared in the input.
		model: String,
		/// What is wrong with the record.
		message: String,
	},

	/// A field value could not be coerced to its declared kind.
	#[error("Invalid value for {model}.{field}: expected {expected}, got {value}")]
	InvalidFieldValue {
		/// Model of the record.
		model: String,
		/// Field name.
		field: String,
		/// Declared kind of the field.
		expected: String,
		/// Raw value that failed coercion.
		value: String,
	},

	/// The requested serialization format is not registered.
	#[error("{0} is not a known serialization format.")]
	UnsupportedFormat(String),

	/// A fixture parsed successfully but contained no records.
	#[error("No fixture data found for '{0}'. (File format may be invalid.)")]
	NoFixtureData(String),

	/// A record-level failure while installing a fixture.
	#[error(
		"Problem installing fixture '{fixture}'{}: {source}",
		.record.as_ref().map(|r| format!(" ({})", r)).unwrap_or_default()
	)]
	Installation {
		/// Fixture name.
		fixture: String,
		/// The offending record, when the failure belongs to one.
		record: Option<RecordLocation>,
		/// Underlying failure.
		#[source]
		source: Box<FixtureError>,
	},

	/// Fixture file not found.
	#[error("Fixture file not found: {0}")]
	FileNotFound(String),

	/// The record store rejected an operation.
	#[error("Store error: {0}")]
	Store(String),

	/// Error serializing records to a fixture format.
	#[error("Serialization error: {0}")]
	Serialization(String),

	/// Invalid fixture settings.
	#[error("Settings error: {0}")]
	Settings(#[from] toml::de::Error),

	/// Validation failed for a specific argument.
	#[error("Validation error: {field}: {message}")]
	Validation {
		/// Argument that failed validation.
		field: String,
		/// Validation error message.
		message: String,
	},

	/// I/O operation failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// YAML serialization/deserialization error (when yaml feature is enabled).
	#[cfg(feature = "yaml")]
	#[error("YAML error: {0}")]
	Yaml(#[from] serde_yaml::Error),
}

impl FixtureError {
	/// Wraps this error with the name of the fixture being installed.
	///
	/// Errors that already carry fixture context are returned unchanged.
	pub fn in_fixture(self, fixture: impl Into<String>) -> Self {
		match self {
			Self::Installation { .. } | Self::NoFixtureData(_) | Self::FileNotFound(_) => self,
			other => Self::Installation {
				fixture: fixture.into(),
				record: None,
				source: Box::new(other),
			},
		}
	}

	/// Wraps this error with the fixture name and the offending record.
	pub fn at_record(self, fixture: impl Into<String>, record: RecordLocation) -> Self {
		match self {
			Self::Installation { .. } | Self::NoFixtureData(_) | Self::FileNotFound(_) => self,
			other => Self::Installation {
				fixture: fixture.into(),
				record: Some(record),
				source: Box::new(other),
			},
		}
	}

	pub(crate) fn malformed(model: impl Into<String>, message: impl Into<String>) -> Self {
		Self::MalformedRecord {
			model: model.into(),
			message: message.into(),
		}
	}
}

/// Position of a record within its fixture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
	/// 1-based position of the record in the source.
	pub index: usize,
	/// Primary key as written in the source, if any.
	pub pk: Option<String>,
}

impl RecordLocation {
	/// Creates a location from a position and a raw primary key.
	pub fn new(index: usize, pk: Option<&serde_json::Value>) -> Self {
		let pk = pk.filter(|pk| !pk.is_null()).map(|pk| match pk {
			serde_json::Value::String(s) => s.clone(),
			other => other.to_string(),
		});
		Self { index, pk }
	}
}

impl std::fmt::Display for RecordLocation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "record {}", self.index)?;
		if let Some(pk) = &self.pk {
			write!(f, ", pk={}", pk)?;
		}
		Ok(())
	}
}

/// Result type alias for fixture operations.
pub type FixtureResult<T> = Result<T, FixtureError>;
