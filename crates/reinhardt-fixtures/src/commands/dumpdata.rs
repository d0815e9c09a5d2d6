//! dumpdata command implementation.
//!
//! This command writes the records of the selected models to a sink in a
//! fixture format.

use std::io::Write;
use std::sync::Arc;

use crate::error::{FixtureError, FixtureResult};
use crate::fixtures::{FixtureSerializer, FormatRegistry, SerializeOptions};
use crate::model::{ModelId, RecordType, TypeRegistry};
use crate::settings::FixtureSettings;
use crate::store::RecordStore;

/// Arguments for the dumpdata command.
#[derive(Debug, Clone, Default)]
pub struct DumpDataArgs {
	/// App labels (`app`) or model labels (`app.Model`). Empty dumps every
	/// registered model.
	pub labels: Vec<String>,
}

impl DumpDataArgs {
	/// Creates arguments from labels.
	pub fn new<I, S>(labels: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			labels: labels.into_iter().map(Into::into).collect(),
		}
	}
}

/// Options for the dumpdata command.
#[derive(Debug, Clone, Default)]
pub struct DumpDataOptions {
	/// Output format. `None` uses the settings.
	pub format: Option<String>,

	/// Output indentation. `None` uses the settings.
	pub indent: Option<usize>,

	/// Write relations as natural keys.
	pub use_natural_keys: bool,

	/// App or model labels to leave out.
	pub exclude: Vec<String>,
}

impl DumpDataOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the output format.
	pub fn with_format(mut self, format: impl Into<String>) -> Self {
		self.format = Some(format.into());
		self
	}

	/// Sets the output indentation.
	pub fn with_indent(mut self, indent: usize) -> Self {
		self.indent = Some(indent);
		self
	}

	/// Sets whether to use natural keys.
	pub fn with_natural_keys(mut self, use_natural_keys: bool) -> Self {
		self.use_natural_keys = use_natural_keys;
		self
	}

	/// Adds an excluded app or model label.
	pub fn with_exclude(mut self, label: impl Into<String>) -> Self {
		self.exclude.push(label.into());
		self
	}
}

/// Result of a dump.
#[derive(Debug, Clone, Default)]
pub struct DumpResult {
	/// Number of records written.
	pub records_dumped: usize,

	/// Models considered, in output order of selection.
	pub models: Vec<String>,
}

/// The dumpdata command for exporting records as fixtures.
///
/// This command is equivalent to Django's `manage.py dumpdata` command.
pub struct DumpDataCommand<'a> {
	registry: &'a TypeRegistry,
	store: &'a dyn RecordStore,
	settings: FixtureSettings,
	formats: FormatRegistry,
}

impl<'a> DumpDataCommand<'a> {
	/// Creates a new dumpdata command.
	pub fn new(registry: &'a TypeRegistry, store: &'a dyn RecordStore) -> Self {
		Self {
			registry,
			store,
			settings: FixtureSettings::default(),
			formats: FormatRegistry::default(),
		}
	}

	/// Uses the given settings.
	pub fn with_settings(mut self, settings: FixtureSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Uses a custom format registry.
	pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
		self.formats = formats;
		self
	}

	/// Returns the command name.
	pub fn name(&self) -> &str {
		"dumpdata"
	}

	/// Returns the command description.
	pub fn description(&self) -> &str {
		"Outputs the contents of the database as a fixture of the given format"
	}

	/// Returns the command help text.
	pub fn help(&self) -> &str {
		r#"
Usage: dumpdata [options] [app_label[.ModelName] ...]

Outputs the contents of the database as a fixture of the given format.

Arguments:
  label                App label or app_label.ModelName (all models if omitted)

Options:
  --format FORMAT      Output serialization format (default: json)
  --indent N           Indentation level for pretty printing
  --natural            Use natural keys for relations
  --exclude, -e LABEL  App or model to exclude (can be repeated)
"#
	}

	/// Executes the dumpdata command, writing the fixture to `sink`.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::UnsupportedFormat`] for an unknown format,
	/// [`FixtureError::UnknownType`] for an unknown model label,
	/// [`FixtureError::Validation`] for an unknown app label, and
	/// [`FixtureError::CyclicDependency`] when natural keys cannot be
	/// ordered.
	pub fn execute<W: Write + ?Sized>(
		&self,
		args: DumpDataArgs,
		options: DumpDataOptions,
		sink: &mut W,
	) -> FixtureResult<DumpResult> {
		let format_name = options
			.format
			.as_deref()
			.unwrap_or(&self.settings.default_format);
		let format = self.formats.get(format_name)?;
		let indent = options.indent.unwrap_or(self.settings.indent);

		let (types, selected) = self.select(&args.labels)?;
		let excluded = self.excluded(&options.exclude)?;
		let types: Vec<Arc<RecordType>> = types
			.into_iter()
			.filter(|rt| !excluded.iter().any(|ex| ex.matches(rt.id())))
			.collect();

		let serializer = FixtureSerializer::new()
			.with_format(format)
			.with_indent(indent);
		let serialize_options = SerializeOptions::new()
			.with_natural_keys(options.use_natural_keys)
			.with_selected_types(selected);

		let records =
			serializer.serialize_types(self.registry, self.store, &types, &serialize_options)?;
		serializer.write_to(&records, sink)?;

		tracing::info!(
			format = format_name,
			models = types.len(),
			records = records.len(),
			"dumped fixture data"
		);

		Ok(DumpResult {
			records_dumped: records.len(),
			models: types.iter().map(|rt| rt.id().to_string()).collect(),
		})
	}

	/// Resolves labels to types, and the model labels named explicitly.
	fn select(&self, labels: &[String]) -> FixtureResult<(Vec<Arc<RecordType>>, Vec<ModelId>)> {
		if labels.is_empty() {
			return Ok((self.registry.all(), Vec::new()));
		}

		let mut types: Vec<Arc<RecordType>> = Vec::new();
		let mut selected = Vec::new();

		for label in labels {
			let resolved = if label.contains('.') {
				let record_type = self.registry.resolve(label)?;
				selected.push(record_type.id().clone());
				vec![record_type]
			} else {
				let models = self.registry.app_models(label);
				if models.is_empty() {
					return Err(FixtureError::Validation {
						field: "labels".to_string(),
						message: format!("Unknown application: {}", label),
					});
				}
				models
			};

			for record_type in resolved {
				if !types.iter().any(|t| t.id() == record_type.id()) {
					types.push(record_type);
				}
			}
		}

		Ok((types, selected))
	}

	fn excluded(&self, labels: &[String]) -> FixtureResult<Vec<Exclusion>> {
		labels
			.iter()
			.map(|label| {
				if label.contains('.') {
					self.registry
						.resolve(label)
						.map(|rt| Exclusion::Model(rt.id().clone()))
						.map_err(|_| FixtureError::Validation {
							field: "exclude".to_string(),
							message: format!("Unknown model in excludes: {}", label),
						})
				} else if self.registry.app_models(label).is_empty() {
					Err(FixtureError::Validation {
						field: "exclude".to_string(),
						message: format!("Unknown app in excludes: {}", label),
					})
				} else {
					Ok(Exclusion::App(label.clone()))
				}
			})
			.collect()
	}
}

impl std::fmt::Debug for DumpDataCommand<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DumpDataCommand")
			.field("settings", &self.settings)
			.field("formats", &self.formats)
			.finish()
	}
}

enum Exclusion {
	App(String),
	Model(ModelId),
}

impl Exclusion {
	fn matches(&self, id: &ModelId) -> bool {
		match self {
			Self::App(app) => id.app_label().eq_ignore_ascii_case(app),
			Self::Model(model) => model == id,
		}
	}
}
