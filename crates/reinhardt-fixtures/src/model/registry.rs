//! Record type registry.
//!
//! Maps model identifiers to their [`RecordType`] declarations. A registry
//! can be created per test or per application; a process-wide instance is
//! available through [`TypeRegistry::global`].

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::{ModelId, RecordType};
use crate::error::{FixtureError, FixtureResult};

/// Global registry instance.
static GLOBAL_REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

#[derive(Debug, Default)]
struct Entries {
	by_key: HashMap<String, Arc<RecordType>>,
	// Registration order, used when listing the models of an app.
	order: Vec<String>,
}

/// Registry of record types keyed by case-insensitive model identifier.
#[derive(Debug, Default)]
pub struct TypeRegistry {
	entries: RwLock<Entries>,
}

impl TypeRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the process-wide registry.
	pub fn global() -> &'static TypeRegistry {
		&GLOBAL_REGISTRY
	}

	/// Registers a record type, replacing any previous declaration with the
	/// same identifier.
	pub fn register(&self, record_type: impl Into<Arc<RecordType>>) -> Arc<RecordType> {
		let record_type = record_type.into();
		let key = record_type.id().key();
		let mut entries = self.entries.write();
		if entries.by_key.insert(key.clone(), record_type.clone()).is_none() {
			entries.order.push(key);
		}
		record_type
	}

	/// Gets a record type by identifier.
	pub fn get(&self, id: &ModelId) -> Option<Arc<RecordType>> {
		self.entries.read().by_key.get(&id.key()).cloned()
	}

	/// Gets a record type by its `app.Model` label.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::MalformedRecord`] for a malformed label and
	/// [`FixtureError::UnknownType`] when nothing is registered under it.
	pub fn resolve(&self, label: &str) -> FixtureResult<Arc<RecordType>> {
		let id = ModelId::parse(label)?;
		self.get(&id)
			.ok_or_else(|| FixtureError::UnknownType(label.to_string()))
	}

	/// Checks if a record type is registered.
	pub fn contains(&self, id: &ModelId) -> bool {
		self.entries.read().by_key.contains_key(&id.key())
	}

	/// Returns the record types of one app in registration order.
	pub fn app_models(&self, app_label: &str) -> Vec<Arc<RecordType>> {
		let entries = self.entries.read();
		entries
			.order
			.iter()
			.filter_map(|key| entries.by_key.get(key))
			.filter(|rt| rt.id().app_label().eq_ignore_ascii_case(app_label))
			.cloned()
			.collect()
	}

	/// Returns every registered record type in registration order.
	pub fn all(&self) -> Vec<Arc<RecordType>> {
		let entries = self.entries.read();
		entries
			.order
			.iter()
			.filter_map(|key| entries.by_key.get(key))
			.cloned()
			.collect()
	}

	/// Returns the number of registered record types.
	pub fn len(&self) -> usize {
		self.entries.read().by_key.len()
	}

	/// Returns true if nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.entries.read().by_key.is_empty()
	}

	/// Clears all registered record types.
	///
	/// This is primarily useful for testing.
	pub fn clear(&self) {
		let mut entries = self.entries.write();
		entries.by_key.clear();
		entries.order.clear();
	}
}

/// Registers a record type in the global registry.
///
/// # Example
///
/// ```
/// # use reinhardt_fixtures::model::{FieldKind, RecordType, TypeRegistry, register_record_type};
/// let widget = RecordType::builder("docs", "Widget")
///     .field("name", FieldKind::String)
///     .build()
///     .unwrap();
/// register_record_type(widget);
/// assert!(TypeRegistry::global().resolve("docs.widget").is_ok());
/// ```
pub fn register_record_type(record_type: impl Into<Arc<RecordType>>) -> Arc<RecordType> {
	GLOBAL_REGISTRY.register(record_type)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::FieldKind;
	use rstest::rstest;

	fn simple(app: &str, name: &str) -> RecordType {
		RecordType::builder(app, name)
			.field("name", FieldKind::String)
			.build()
			.unwrap()
	}

	#[rstest]
	fn test_register_and_resolve() {
		let registry = TypeRegistry::new();
		registry.register(simple("fixtures_regress", "Animal"));

		assert!(registry.contains(&ModelId::new("fixtures_regress", "animal")));
		assert_eq!(
			registry.resolve("fixtures_regress.animal").unwrap().id().model_name(),
			"Animal"
		);
		assert!(matches!(
			registry.resolve("fixtures_regress.Plant"),
			Err(FixtureError::UnknownType(_))
		));
		assert!(matches!(
			registry.resolve("Animal"),
			Err(FixtureError::MalformedRecord { .. })
		));
	}

	#[rstest]
	fn test_app_models_in_registration_order() {
		let registry = TypeRegistry::new();
		registry.register(simple("shop", "Store"));
		registry.register(simple("auth", "User"));
		registry.register(simple("shop", "Book"));
		registry.register(simple("shop", "Store"));

		let names: Vec<String> = registry
			.app_models("shop")
			.iter()
			.map(|rt| rt.id().model_name().to_string())
			.collect();
		assert_eq!(names, vec!["Store", "Book"]);
		assert_eq!(registry.len(), 3);
	}

	#[rstest]
	fn test_clear() {
		let registry = TypeRegistry::new();
		registry.register(simple("shop", "Store"));
		assert!(!registry.is_empty());

		registry.clear();
		assert!(registry.is_empty());
		assert!(registry.all().is_empty());
	}

	#[rstest]
	fn test_global_registry() {
		register_record_type(simple("registry_global", "Thing"));
		assert!(
			TypeRegistry::global()
				.contains(&ModelId::new("registry_global", "Thing"))
		);
	}
}
