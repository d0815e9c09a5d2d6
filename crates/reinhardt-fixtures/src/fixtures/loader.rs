//! Fixture loading.
//!
//! [`FixtureLoader`] finds named fixtures on disk, parses them and installs
//! their records into a [`RecordStore`]. Every source is installed inside its
//! own [`TransactionScope`]: either all of its records are committed or none.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Deserializer, FixtureData, FixtureParser, FormatRegistry, SerializationFormat};
use crate::error::{FixtureError, FixtureResult, RecordLocation};
use crate::model::TypeRegistry;
use crate::settings::FixtureSettings;
use crate::store::{RecordStore, TransactionScope};

/// Options for loading fixtures.
#[derive(Debug, Clone)]
pub struct LoadOptions {
	/// Only install records of these apps. Empty means all apps.
	pub app_labels: Vec<String>,

	/// Skip records of unknown models and undeclared fields.
	pub ignore_missing: bool,

	/// Install each source inside a transaction.
	pub use_transaction: bool,

	/// Record a failing source and move on to the next one.
	pub continue_on_error: bool,

	/// Verbosity level. At 0 installed fixtures are only reported at debug
	/// level.
	pub verbosity: u8,
}

impl Default for LoadOptions {
	fn default() -> Self {
		Self {
			app_labels: Vec::new(),
			ignore_missing: false,
			use_transaction: true,
			continue_on_error: false,
			verbosity: 1,
		}
	}
}

impl LoadOptions {
	/// Creates default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets app labels filter.
	pub fn with_app_labels(mut self, labels: Vec<String>) -> Self {
		self.app_labels = labels;
		self
	}

	/// Sets ignore missing flag.
	pub fn with_ignore_missing(mut self, ignore: bool) -> Self {
		self.ignore_missing = ignore;
		self
	}

	/// Sets use transaction flag.
	pub fn with_transaction(mut self, use_tx: bool) -> Self {
		self.use_transaction = use_tx;
		self
	}

	/// Sets continue on error flag.
	pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
		self.continue_on_error = continue_on_error;
		self
	}

	/// Sets verbosity level.
	pub fn with_verbosity(mut self, level: u8) -> Self {
		self.verbosity = level;
		self
	}

	fn reports_fixtures(&self) -> bool {
		self.verbosity > 0
	}

	fn includes_app(&self, model: &str) -> bool {
		if self.app_labels.is_empty() {
			return true;
		}
		model
			.split_once('.')
			.is_some_and(|(app, _)| self.app_labels.iter().any(|l| l.eq_ignore_ascii_case(app)))
	}
}

/// Statistics of a load.
#[derive(Debug, Default)]
pub struct LoadResult {
	/// Number of records installed.
	pub records_loaded: usize,

	/// Number of fixture sources installed.
	pub fixtures_loaded: usize,

	/// Models skipped because they are not registered.
	pub skipped_models: Vec<String>,

	/// Failures of sources skipped under `continue_on_error`.
	pub errors: Vec<FixtureError>,
}

impl LoadResult {
	/// Returns true if no source failed.
	pub fn is_success(&self) -> bool {
		self.errors.is_empty()
	}

	fn skip_model(&mut self, model: String) {
		if !self.skipped_models.contains(&model) {
			self.skipped_models.push(model);
		}
	}
}

/// Installs fixtures into a record store.
///
/// # Example
///
/// ```
/// use reinhardt_fixtures::fixtures::FixtureLoader;
/// use reinhardt_fixtures::model::{FieldKind, RecordType, TypeRegistry};
/// use reinhardt_fixtures::store::MemoryStore;
///
/// let registry = TypeRegistry::new();
/// registry.register(
///     RecordType::builder("zoo", "Animal")
///         .field("name", FieldKind::String)
///         .build()
///         .unwrap(),
/// );
/// let store = MemoryStore::new();
///
/// let loader = FixtureLoader::new(&registry, &store);
/// let result = loader
///     .load_str("animals", r#"[{"model": "zoo.animal", "pk": 1, "fields": {"name": "Lion"}}]"#, "json")
///     .unwrap();
/// assert_eq!(result.records_loaded, 1);
/// ```
pub struct FixtureLoader<'a> {
	registry: &'a TypeRegistry,
	store: &'a dyn RecordStore,
	parser: FixtureParser,
	fixture_dirs: Vec<PathBuf>,
	options: LoadOptions,
}

impl<'a> FixtureLoader<'a> {
	/// Creates a loader with default options.
	pub fn new(registry: &'a TypeRegistry, store: &'a dyn RecordStore) -> Self {
		Self {
			registry,
			store,
			parser: FixtureParser::new(),
			fixture_dirs: Vec::new(),
			options: LoadOptions::default(),
		}
	}

	/// Sets the load options.
	pub fn with_options(mut self, options: LoadOptions) -> Self {
		self.options = options;
		self
	}

	/// Sets the directories searched for named fixtures.
	pub fn with_fixture_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
		self.fixture_dirs = dirs;
		self
	}

	/// Uses a custom format registry.
	pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
		self.parser = FixtureParser::with_formats(formats);
		self
	}

	/// Applies fixture directories and the transaction flag from settings.
	pub fn with_settings(mut self, settings: &FixtureSettings) -> Self {
		self.fixture_dirs = settings.fixture_dirs.clone();
		self.options.use_transaction = settings.use_transaction;
		self
	}

	/// Returns the load options.
	pub fn options(&self) -> &LoadOptions {
		&self.options
	}

	/// Loads fixtures by name.
	///
	/// A name with an extension selects its format. A name without one is
	/// tried with every registered format. Relative names are searched in
	/// each fixture directory and then relative to the working directory;
	/// absolute names are used as they are.
	///
	/// # Errors
	///
	/// Fails on the first failing source unless `continue_on_error` is set,
	/// in which case failures are collected in [`LoadResult::errors`].
	pub fn load(&self, names: &[&str]) -> FixtureResult<LoadResult> {
		let mut result = LoadResult::default();

		for name in names {
			let label = fixture_name(name);
			let outcome = self.find_sources(name, label).and_then(|sources| {
				for (path, format) in sources {
					self.load_source(label, &path, format.as_ref(), &mut result)?;
				}
				Ok(())
			});
			self.settle(label, outcome, &mut result)?;
		}

		Ok(result)
	}

	/// Loads fixture files from explicit paths.
	pub fn load_from_paths(&self, paths: &[&Path]) -> FixtureResult<LoadResult> {
		let mut result = LoadResult::default();

		for path in paths {
			let name = path.display().to_string();
			let name = fixture_name(&name);
			let outcome = self
				.parser
				.formats()
				.for_path(path)
				.and_then(|format| {
					format.ok_or_else(|| FixtureError::UnsupportedFormat("(none)".to_string()))
				})
				.map_err(|e| e.in_fixture(name))
				.and_then(|format| self.load_source(name, path, format.as_ref(), &mut result));
			self.settle(name, outcome, &mut result)?;
		}

		Ok(result)
	}

	/// Loads fixture content held in memory.
	pub fn load_str(&self, name: &str, content: &str, format: &str) -> FixtureResult<LoadResult> {
		let mut result = LoadResult::default();
		let data = self
			.parser
			.parse_string(content, format)
			.map_err(|e| e.in_fixture(name))?;
		self.install(name, data, &mut result)?;
		Ok(result)
	}

	/// Installs already parsed fixture data as one source.
	pub fn load_data(&self, name: &str, data: FixtureData) -> FixtureResult<LoadResult> {
		let mut result = LoadResult::default();
		self.install(name, data, &mut result)?;
		Ok(result)
	}

	fn settle(
		&self,
		name: &str,
		outcome: FixtureResult<()>,
		result: &mut LoadResult,
	) -> FixtureResult<()> {
		match outcome {
			Ok(()) => Ok(()),
			Err(e) if self.options.continue_on_error => {
				tracing::warn!(fixture = %name, error = %e, "fixture failed, continuing");
				result.errors.push(e);
				Ok(())
			}
			Err(e) => Err(e),
		}
	}

	fn find_sources(
		&self,
		name: &str,
		label: &str,
	) -> FixtureResult<Vec<(PathBuf, Arc<dyn SerializationFormat>)>> {
		let path = Path::new(name);
		let formats = self.parser.formats();

		let explicit = formats.for_path(path).map_err(|e| e.in_fixture(label))?;

		let bases: Vec<PathBuf> = if path.is_absolute() {
			vec![path.to_path_buf()]
		} else {
			self.fixture_dirs
				.iter()
				.map(|dir| dir.join(path))
				.chain(std::iter::once(path.to_path_buf()))
				.collect()
		};

		let mut sources: Vec<(PathBuf, Arc<dyn SerializationFormat>)> = Vec::new();
		for base in bases {
			let candidates = match &explicit {
				Some(format) => vec![(base, format.clone())],
				None => {
					let mut candidates = Vec::new();
					for format in formats.formats() {
						for ext in format.extensions() {
							let mut candidate = OsString::from(base.as_os_str());
							candidate.push(".");
							candidate.push(ext);
							candidates.push((PathBuf::from(candidate), format.clone()));
						}
					}
					candidates
				}
			};
			let found: Vec<_> = candidates
				.into_iter()
				.filter(|(candidate, _)| candidate.is_file())
				.collect();

			let distinct_formats = {
				let mut names: Vec<&str> = found.iter().map(|(_, f)| f.name()).collect();
				names.dedup();
				names.len()
			};
			if distinct_formats > 1 {
				return Err(FixtureError::Validation {
					field: name.to_string(),
					message: format!(
						"Multiple fixtures named '{}' in {}. Aborting.",
						name,
						base_dir(&found[0].0).display()
					),
				});
			}

			for source in found {
				if !sources.iter().any(|(p, _)| *p == source.0) {
					sources.push(source);
				}
			}
		}

		if sources.is_empty() {
			return Err(FixtureError::FileNotFound(name.to_string()));
		}

		Ok(sources)
	}

	fn load_source(
		&self,
		name: &str,
		path: &Path,
		format: &dyn SerializationFormat,
		result: &mut LoadResult,
	) -> FixtureResult<()> {
		tracing::debug!(
			fixture = %name,
			path = %path.display(),
			format = format.name(),
			"installing fixture"
		);

		let data = self
			.parser
			.parse_file_as(path, format)
			.map_err(|e| e.in_fixture(name))?;
		self.install(name, data, result)
	}

	fn install(&self, name: &str, data: FixtureData, result: &mut LoadResult) -> FixtureResult<()> {
		if data.is_empty() {
			return Err(FixtureError::NoFixtureData(name.to_string()));
		}

		let (sources, records): (Vec<_>, Vec<_>) = data
			.records
			.into_iter()
			.enumerate()
			.filter(|(_, record)| self.options.includes_app(&record.model))
			.map(|(idx, record)| {
				let location = RecordLocation::new(idx + 1, record.pk.as_ref());
				((location, record.model.clone()), record)
			})
			.unzip();

		let scope = if self.options.use_transaction {
			Some(TransactionScope::begin(self.store).map_err(|e| e.in_fixture(name))?)
		} else {
			None
		};

		let mut deserializer = Deserializer::new(self.registry, self.store, records)
			.with_ignore_unknown_fields(self.options.ignore_missing);
		let mut loaded = 0;
		let mut skipped = Vec::new();

		while let Some(item) = deserializer.next() {
			let (location, own_model) = &sources[deserializer.position() - 1];
			let record = match item {
				Ok(record) => record,
				// Only the record's own model may be skipped, not a relation target.
				Err(FixtureError::UnknownType(model))
					if self.options.ignore_missing && model.eq_ignore_ascii_case(own_model) =>
				{
					tracing::warn!(fixture = %name, model = %model, "skipping unknown model");
					skipped.push(model);
					continue;
				}
				Err(e) => {
					tracing::error!(
						fixture = %name,
						record = %location,
						error = %e,
						"failed to install record"
					);
					return Err(e.at_record(name, location.clone()));
				}
			};

			let record_type = self.registry.get(&record.model).ok_or_else(|| {
				FixtureError::UnknownType(record.model.to_string())
					.at_record(name, location.clone())
			})?;
			self.store.create(&record_type, record).map_err(|e| {
				tracing::error!(
					fixture = %name,
					record = %location,
					error = %e,
					"failed to store record"
				);
				e.at_record(name, location.clone())
			})?;
			loaded += 1;
		}

		if let Some(scope) = scope {
			scope.commit().map_err(|e| e.in_fixture(name))?;
		}

		if self.options.reports_fixtures() {
			tracing::info!(fixture = %name, records = loaded, "installed fixture");
		} else {
			tracing::debug!(fixture = %name, records = loaded, "installed fixture");
		}
		result.records_loaded += loaded;
		result.fixtures_loaded += 1;
		for model in skipped {
			result.skip_model(model);
		}
		Ok(())
	}
}

impl std::fmt::Debug for FixtureLoader<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FixtureLoader")
			.field("fixture_dirs", &self.fixture_dirs)
			.field("options", &self.options)
			.finish()
	}
}

/// Fixture name without its format extension.
fn fixture_name(name: &str) -> &str {
	match Path::new(name).extension().and_then(|ext| ext.to_str()) {
		Some(ext) => &name[..name.len() - ext.len() - 1],
		None => name,
	}
}

fn base_dir(path: &Path) -> &Path {
	path.parent().unwrap_or(Path::new("."))
}
