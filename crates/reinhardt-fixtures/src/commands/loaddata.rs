//! loaddata command implementation.
//!
//! This command installs named fixtures into a record store.

use crate::error::{FixtureError, FixtureResult};
use crate::fixtures::{FixtureLoader, LoadOptions, LoadResult};
use crate::model::TypeRegistry;
use crate::settings::FixtureSettings;
use crate::store::RecordStore;

/// Arguments for the loaddata command.
#[derive(Debug, Clone, Default)]
pub struct LoadDataArgs {
	/// Fixture names or paths to load.
	pub fixtures: Vec<String>,
}

impl LoadDataArgs {
	/// Creates arguments from fixture names.
	pub fn new<I, S>(fixtures: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			fixtures: fixtures.into_iter().map(Into::into).collect(),
		}
	}
}

/// Options for the loaddata command.
#[derive(Debug, Clone)]
pub struct LoadDataOptions {
	/// Filter by app labels.
	pub app_labels: Vec<String>,

	/// Continue even if a model is not found.
	pub ignore_missing: bool,

	/// Wrap each fixture in a transaction. `None` uses the settings.
	pub use_transaction: Option<bool>,

	/// Record failing fixtures and keep going.
	pub continue_on_error: bool,

	/// Verbosity level.
	pub verbosity: u8,
}

impl Default for LoadDataOptions {
	fn default() -> Self {
		Self {
			app_labels: Vec::new(),
			ignore_missing: false,
			use_transaction: None,
			continue_on_error: false,
			verbosity: 1,
		}
	}
}

impl LoadDataOptions {
	/// Creates new default options.
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
		self.use_transaction = Some(use_tx);
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
}

/// The loaddata command for installing fixtures.
///
/// This command is equivalent to Django's `manage.py loaddata` command.
///
/// # Example
///
/// ```
/// use reinhardt_fixtures::commands::{LoadDataArgs, LoadDataCommand, LoadDataOptions};
/// use reinhardt_fixtures::model::TypeRegistry;
/// use reinhardt_fixtures::store::MemoryStore;
///
/// let registry = TypeRegistry::new();
/// let store = MemoryStore::new();
/// let command = LoadDataCommand::new(&registry, &store);
///
/// let result = command.execute(LoadDataArgs::new(["/nonexistent/users.json"]), LoadDataOptions::new());
/// assert!(result.is_err());
/// ```
pub struct LoadDataCommand<'a> {
	registry: &'a TypeRegistry,
	store: &'a dyn RecordStore,
	settings: FixtureSettings,
}

impl<'a> LoadDataCommand<'a> {
	/// Creates a new loaddata command.
	pub fn new(registry: &'a TypeRegistry, store: &'a dyn RecordStore) -> Self {
		Self {
			registry,
			store,
			settings: FixtureSettings::default(),
		}
	}

	/// Uses the given settings.
	pub fn with_settings(mut self, settings: FixtureSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Returns the command name.
	pub fn name(&self) -> &str {
		"loaddata"
	}

	/// Returns the command description.
	pub fn description(&self) -> &str {
		"Installs the named fixture(s) in the database"
	}

	/// Returns the command help text.
	pub fn help(&self) -> &str {
		r#"
Usage: loaddata [options] fixture [fixture ...]

Installs the named fixture(s) in the database.

Arguments:
  fixture              Fixture name, file name or absolute path

Options:
  --app, -a LABEL      Only load fixtures for the specified app(s)
  --ignore-missing     Ignore unknown models and fields
  --no-transaction     Do not wrap each fixture in a transaction
  --continue           Keep going when a fixture fails
  --verbosity LEVEL    Verbosity level (0=minimal, 1=normal, 2=verbose)
"#
	}

	/// Executes the loaddata command.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Validation`] when no fixture is named, and the
	/// first fixture failure unless `continue_on_error` is set.
	pub fn execute(&self, args: LoadDataArgs, options: LoadDataOptions) -> FixtureResult<LoadResult> {
		if args.fixtures.is_empty() {
			return Err(FixtureError::Validation {
				field: "fixtures".to_string(),
				message: "At least one fixture must be specified".to_string(),
			});
		}

		let load_options = LoadOptions {
			app_labels: options.app_labels,
			ignore_missing: options.ignore_missing,
			use_transaction: options
				.use_transaction
				.unwrap_or(self.settings.use_transaction),
			continue_on_error: options.continue_on_error,
			verbosity: options.verbosity,
		};

		let loader = FixtureLoader::new(self.registry, self.store)
			.with_fixture_dirs(self.settings.fixture_dirs.clone())
			.with_options(load_options);
		let names: Vec<&str> = args.fixtures.iter().map(String::as_str).collect();

		let result = loader.load(&names)?;

		if options.verbosity > 0 {
			self.print_result(&result);
		}

		Ok(result)
	}

	/// Prints the load result summary.
	fn print_result(&self, result: &LoadResult) {
		println!(
			"Installed {} object(s) from {} fixture(s)",
			result.records_loaded, result.fixtures_loaded
		);

		if !result.skipped_models.is_empty() {
			println!("Skipped models: {:?}", result.skipped_models);
		}

		if !result.errors.is_empty() {
			eprintln!("Errors:");
			for error in &result.errors {
				eprintln!("  - {}", error);
			}
		}
	}
}

impl std::fmt::Debug for LoadDataCommand<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LoadDataCommand")
			.field("settings", &self.settings)
			.finish()
	}
}
