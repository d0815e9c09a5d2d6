//! Fixture format definitions.
//!
//! This module defines the Django-compatible fixture unit and the pluggable
//! textual encodings fixtures can be written in.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FixtureError, FixtureResult};

/// Django-compatible fixture record.
///
/// Each record represents a single model instance with its field values.
/// Relation fields hold either surrogate ids or natural-key arrays.
///
/// # Example
///
/// ```json
/// {
///   "model": "fixtures_regress.book",
///   "pk": 1,
///   "fields": {
///     "name": "Cryptonomicon",
///     "author": ["Neal Stephenson"],
///     "stores": [["Amazon"], ["Borders"]]
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureRecord {
	/// Model identifier in format "app.Model" (e.g., "auth.User").
	pub model: String,

	/// Primary key value. Optional when natural keys identify the record.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pk: Option<Value>,

	/// Field values as a JSON object.
	#[serde(default = "empty_fields")]
	pub fields: Value,
}

fn empty_fields() -> Value {
	Value::Object(serde_json::Map::new())
}

impl FixtureRecord {
	/// Creates a new fixture record.
	pub fn new(model: impl Into<String>, fields: Value) -> Self {
		Self {
			model: model.into(),
			pk: None,
			fields,
		}
	}

	/// Creates a new fixture record with a primary key.
	pub fn with_pk(model: impl Into<String>, pk: Value, fields: Value) -> Self {
		Self {
			model: model.into(),
			pk: Some(pk),
			fields,
		}
	}

	/// Returns the app label portion of the model identifier.
	///
	/// # Example
	///
	/// ```
	/// # use reinhardt_fixtures::fixtures::FixtureRecord;
	/// # use serde_json::json;
	/// let record = FixtureRecord::new("auth.User", json!({}));
	/// assert_eq!(record.app_label(), Some("auth"));
	/// ```
	pub fn app_label(&self) -> Option<&str> {
		self.model.split_once('.').map(|(app, _)| app)
	}

	/// Returns the model name portion of the model identifier.
	pub fn model_name(&self) -> Option<&str> {
		self.model.split_once('.').map(|(_, name)| name)
	}

	/// Checks the structural shape of the record.
	///
	/// The model identifier must be in `app.Model` form and `fields` must be
	/// an object.
	pub fn validate(&self) -> FixtureResult<()> {
		crate::model::ModelId::parse(&self.model)?;

		if !self.fields.is_object() {
			return Err(FixtureError::malformed(
				&self.model,
				"Fields must be a JSON object",
			));
		}

		Ok(())
	}
}

/// A textual encoding for fixture records.
///
/// Implement this trait to plug a new format into a [`FormatRegistry`].
pub trait SerializationFormat: Send + Sync {
	/// Format name used on the command line (e.g., "json").
	fn name(&self) -> &str;

	/// File extensions recognized for this format, lowercase, without dot.
	fn extensions(&self) -> &[&str];

	/// Parses fixture content into records.
	///
	/// Content that is well formed but does not hold a record collection
	/// yields no records.
	fn parse(&self, content: &str) -> FixtureResult<Vec<FixtureRecord>>;

	/// Renders records. `indent` of 0 produces compact output.
	fn render(&self, records: &[FixtureRecord], indent: usize) -> FixtureResult<String>;
}

/// JSON fixture format.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormat;

impl SerializationFormat for JsonFormat {
	fn name(&self) -> &str {
		"json"
	}

	fn extensions(&self) -> &[&str] {
		&["json"]
	}

	fn parse(&self, content: &str) -> FixtureResult<Vec<FixtureRecord>> {
		if content.trim().is_empty() {
			return Ok(Vec::new());
		}

		// Handle both single object and array formats
		let value: Value = serde_json::from_str(content)?;

		match value {
			Value::Array(arr) => {
				let mut records = Vec::with_capacity(arr.len());
				for (idx, item) in arr.into_iter().enumerate() {
					let record: FixtureRecord = serde_json::from_value(item).map_err(|e| {
						FixtureError::malformed(
							"(unknown)",
							format!("Invalid record at index {}: {}", idx, e),
						)
					})?;
					records.push(record);
				}
				Ok(records)
			}
			Value::Object(_) => {
				let record: FixtureRecord = serde_json::from_value(value).map_err(|e| {
					FixtureError::malformed("(unknown)", format!("Invalid record: {}", e))
				})?;
				Ok(vec![record])
			}
			other => {
				tracing::debug!(kind = json_kind(&other), "JSON fixture holds no records");
				Ok(Vec::new())
			}
		}
	}

	fn render(&self, records: &[FixtureRecord], indent: usize) -> FixtureResult<String> {
		if indent == 0 {
			return serde_json::to_string(records)
				.map_err(|e| FixtureError::Serialization(e.to_string()));
		}

		let indent = " ".repeat(indent);
		let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
		let mut out = Vec::new();
		let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
		records
			.serialize(&mut serializer)
			.map_err(|e| FixtureError::Serialization(e.to_string()))?;
		String::from_utf8(out).map_err(|e| FixtureError::Serialization(e.to_string()))
	}
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

/// YAML fixture format (requires the `yaml` feature).
#[cfg(feature = "yaml")]
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlFormat;

#[cfg(feature = "yaml")]
impl SerializationFormat for YamlFormat {
	fn name(&self) -> &str {
		"yaml"
	}

	fn extensions(&self) -> &[&str] {
		&["yaml", "yml"]
	}

	fn parse(&self, content: &str) -> FixtureResult<Vec<FixtureRecord>> {
		if content.trim().is_empty() {
			return Ok(Vec::new());
		}

		let value: serde_yaml::Value = serde_yaml::from_str(content)?;

		match value {
			serde_yaml::Value::Sequence(seq) => {
				let mut records = Vec::with_capacity(seq.len());
				for (idx, item) in seq.into_iter().enumerate() {
					let record: FixtureRecord = serde_yaml::from_value(item).map_err(|e| {
						FixtureError::malformed(
							"(unknown)",
							format!("Invalid record at index {}: {}", idx, e),
						)
					})?;
					records.push(record);
				}
				Ok(records)
			}
			serde_yaml::Value::Mapping(_) => {
				let record: FixtureRecord = serde_yaml::from_value(value)?;
				Ok(vec![record])
			}
			_ => Ok(Vec::new()),
		}
	}

	fn render(&self, records: &[FixtureRecord], _indent: usize) -> FixtureResult<String> {
		serde_yaml::to_string(records).map_err(|e| FixtureError::Serialization(e.to_string()))
	}
}

/// Registry of available serialization formats.
///
/// The default registry knows `json`, plus `yaml` when the `yaml` feature
/// is enabled.
#[derive(Clone)]
pub struct FormatRegistry {
	formats: Vec<Arc<dyn SerializationFormat>>,
}

impl FormatRegistry {
	/// Creates a registry with no formats.
	pub fn empty() -> Self {
		Self {
			formats: Vec::new(),
		}
	}

	/// Registers a format. A format with the same name is replaced.
	pub fn register(&mut self, format: impl SerializationFormat + 'static) {
		self.formats.retain(|f| f.name() != format.name());
		self.formats.push(Arc::new(format));
	}

	/// Gets a format by name.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::UnsupportedFormat`] if no such format is
	/// registered.
	pub fn get(&self, name: &str) -> FixtureResult<Arc<dyn SerializationFormat>> {
		self.formats
			.iter()
			.find(|f| f.name().eq_ignore_ascii_case(name))
			.cloned()
			.ok_or_else(|| FixtureError::UnsupportedFormat(name.to_string()))
	}

	/// Gets the format registered for a file extension.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::UnsupportedFormat`] naming the extension.
	pub fn for_extension(&self, ext: &str) -> FixtureResult<Arc<dyn SerializationFormat>> {
		let ext = ext.to_ascii_lowercase();
		self.formats
			.iter()
			.find(|f| f.extensions().contains(&ext.as_str()))
			.cloned()
			.ok_or(FixtureError::UnsupportedFormat(ext))
	}

	/// Gets the format for a file path from its extension.
	///
	/// Returns `Ok(None)` for a path without extension.
	pub fn for_path(&self, path: &Path) -> FixtureResult<Option<Arc<dyn SerializationFormat>>> {
		match path.extension().and_then(|e| e.to_str()) {
			Some(ext) => self.for_extension(ext).map(Some),
			None => Ok(None),
		}
	}

	/// Registered formats in registration order.
	pub fn formats(&self) -> &[Arc<dyn SerializationFormat>] {
		&self.formats
	}

	/// Names of the registered formats.
	pub fn names(&self) -> Vec<&str> {
		self.formats.iter().map(|f| f.name()).collect()
	}
}

impl Default for FormatRegistry {
	fn default() -> Self {
		let mut registry = Self::empty();
		registry.register(JsonFormat);
		#[cfg(feature = "yaml")]
		registry.register(YamlFormat);
		registry
	}
}

impl std::fmt::Debug for FormatRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FormatRegistry")
			.field("formats", &self.names())
			.finish()
	}
}

/// Parsed fixture data containing multiple records.
#[derive(Debug, Clone)]
pub struct FixtureData {
	/// Collection of fixture records.
	pub records: Vec<FixtureRecord>,

	/// Name of the format the data was parsed from.
	pub format: String,

	/// Optional source file path.
	pub source: Option<String>,
}

impl FixtureData {
	/// Creates fixture data from a vector of records.
	pub fn from_records(records: Vec<FixtureRecord>, format: impl Into<String>) -> Self {
		Self {
			records,
			format: format.into(),
			source: None,
		}
	}

	/// Sets the source file path.
	pub fn with_source(mut self, source: impl Into<String>) -> Self {
		self.source = Some(source.into());
		self
	}

	/// Returns the number of records.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns true if there are no records.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Filters records by app label.
	pub fn filter_by_app(&self, app_labels: &[&str]) -> Vec<&FixtureRecord> {
		self.records
			.iter()
			.filter(|record| {
				record
					.app_label()
					.map(|app| app_labels.iter().any(|l| l.eq_ignore_ascii_case(app)))
					.unwrap_or(false)
			})
			.collect()
	}
}

impl IntoIterator for FixtureData {
	type Item = FixtureRecord;
	type IntoIter = std::vec::IntoIter<FixtureRecord>;

	fn into_iter(self) -> Self::IntoIter {
		self.records.into_iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_fixture_record_parts() {
		let record = FixtureRecord::new("auth.User", json!({}));
		assert_eq!(record.app_label(), Some("auth"));
		assert_eq!(record.model_name(), Some("User"));
	}

	#[rstest]
	fn test_fixture_record_validate() {
		assert!(FixtureRecord::new("auth.User", json!({})).validate().is_ok());
		assert!(matches!(
			FixtureRecord::new("User", json!({})).validate(),
			Err(FixtureError::MalformedRecord { .. })
		));
		assert!(matches!(
			FixtureRecord::new("auth.User", json!("nope")).validate(),
			Err(FixtureError::MalformedRecord { .. })
		));
	}

	#[rstest]
	fn test_json_parse_array_and_object() {
		let records = JsonFormat
			.parse(r#"[{"model": "a.B", "pk": 1, "fields": {}}, {"model": "a.B", "fields": {}}]"#)
			.unwrap();
		assert_eq!(records.len(), 2);
		assert_eq!(records[0].pk, Some(json!(1)));
		assert!(records[1].pk.is_none());

		let records = JsonFormat.parse(r#"{"model": "a.B", "fields": {}}"#).unwrap();
		assert_eq!(records.len(), 1);
	}

	#[rstest]
	#[case("")]
	#[case("   \n")]
	#[case("[]")]
	#[case("\"not fixtures\"")]
	fn test_json_parse_without_records(#[case] content: &str) {
		assert!(JsonFormat.parse(content).unwrap().is_empty());
	}

	#[rstest]
	fn test_json_parse_syntax_error() {
		assert!(matches!(
			JsonFormat.parse("[{"),
			Err(FixtureError::Json(_))
		));
	}

	#[rstest]
	fn test_json_render_compact_and_pretty() {
		let records = vec![FixtureRecord::with_pk(
			"fixtures_regress.widget",
			json!(1),
			json!({"name": "grommet"}),
		)];

		assert_eq!(
			JsonFormat.render(&records, 0).unwrap(),
			r#"[{"model":"fixtures_regress.widget","pk":1,"fields":{"name":"grommet"}}]"#
		);

		let pretty = JsonFormat.render(&records, 4).unwrap();
		assert!(pretty.contains("\n    {"));
	}

	#[rstest]
	fn test_registry_lookup() {
		let registry = FormatRegistry::default();
		assert_eq!(registry.get("JSON").unwrap().name(), "json");
		assert_eq!(registry.for_extension("json").unwrap().name(), "json");

		let err = registry.for_extension("unkn").err().unwrap();
		assert_eq!(err.to_string(), "unkn is not a known serialization format.");
		assert!(registry.for_path(Path::new("no_extension")).unwrap().is_none());
	}

	#[cfg(feature = "yaml")]
	#[rstest]
	fn test_yaml_round_trip() {
		let records = vec![FixtureRecord::with_pk(
			"auth.User",
			json!(1),
			json!({"username": "admin"}),
		)];
		let output = YamlFormat.render(&records, 2).unwrap();
		assert!(output.contains("model: auth.User"));
		assert_eq!(YamlFormat.parse(&output).unwrap(), records);
	}

	#[rstest]
	fn test_fixture_data_filter_by_app() {
		let data = FixtureData::from_records(
			vec![
				FixtureRecord::new("auth.User", json!({})),
				FixtureRecord::new("blog.Post", json!({})),
				FixtureRecord::new("auth.Group", json!({})),
			],
			"json",
		);

		assert_eq!(data.filter_by_app(&["auth"]).len(), 2);
		assert_eq!(data.len(), 3);
	}
}
