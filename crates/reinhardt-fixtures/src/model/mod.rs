//! Record type metadata.
//!
//! A [`RecordType`] describes one model: its fields, its relations, an
//! optional natural key and the explicit dependencies that natural key needs
//! before it can be resolved. Record types are declared once, registered in a
//! [`TypeRegistry`] and never mutated afterwards.

mod registry;
pub mod value;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub use registry::{TypeRegistry, register_record_type};
pub use value::{FieldValue, NaturalKeyValue, Record, SurrogateId};

use crate::error::{FixtureError, FixtureResult};

/// Qualified model identifier (`app_label.ModelName`).
///
/// Comparison and hashing ignore ASCII case, so `fixtures_regress.store`
/// and `fixtures_regress.Store` name the same model. The original spelling
/// is kept for display.
#[derive(Debug, Clone)]
pub struct ModelId {
	app_label: String,
	model_name: String,
}

impl ModelId {
	/// Creates a model identifier from its parts.
	pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
		Self {
			app_label: app_label.into(),
			model_name: model_name.into(),
		}
	}

	/// Parses an identifier in `app_label.ModelName` form.
	///
	/// # Example
	///
	/// ```
	/// # use reinhardt_fixtures::model::ModelId;
	/// let id = ModelId::parse("auth.User").unwrap();
	/// assert_eq!(id.app_label(), "auth");
	/// assert_eq!(id.model_name(), "User");
	/// assert!(ModelId::parse("User").is_err());
	/// ```
	pub fn parse(qualified: &str) -> FixtureResult<Self> {
		match qualified.split_once('.') {
			Some((app, model)) if !app.is_empty() && !model.is_empty() && !model.contains('.') => {
				Ok(Self::new(app, model))
			}
			_ => Err(FixtureError::malformed(
				qualified,
				format!(
					"Model identifier '{}' must be in 'app.Model' format",
					qualified
				),
			)),
		}
	}

	/// Returns the app label.
	pub fn app_label(&self) -> &str {
		&self.app_label
	}

	/// Returns the model name.
	pub fn model_name(&self) -> &str {
		&self.model_name
	}

	/// Returns the lowercase lookup key.
	pub fn key(&self) -> String {
		format!(
			"{}.{}",
			self.app_label.to_ascii_lowercase(),
			self.model_name.to_ascii_lowercase()
		)
	}
}

impl PartialEq for ModelId {
	fn eq(&self, other: &Self) -> bool {
		self.app_label.eq_ignore_ascii_case(&other.app_label)
			&& self.model_name.eq_ignore_ascii_case(&other.model_name)
	}
}

impl Eq for ModelId {}

impl Hash for ModelId {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.key().hash(state);
	}
}

impl fmt::Display for ModelId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}", self.app_label, self.model_name)
	}
}

impl TryFrom<&str> for ModelId {
	type Error = FixtureError;

	fn try_from(value: &str) -> FixtureResult<Self> {
		Self::parse(value)
	}
}

/// Declared kind of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
	/// Signed integer.
	Integer,
	/// Double precision float.
	Float,
	/// Text.
	String,
	/// Boolean.
	Boolean,
	/// Timestamp without time zone.
	DateTime,
	/// Calendar date.
	Date,
	/// Single-valued relation.
	ForeignKey {
		/// Target model.
		to: ModelId,
	},
	/// Multi-valued relation.
	ManyToMany {
		/// Target model.
		to: ModelId,
		/// Explicit join model, if any.
		through: Option<ModelId>,
	},
}

impl FieldKind {
	/// Returns the target model of a relation kind.
	pub fn relation_target(&self) -> Option<&ModelId> {
		match self {
			Self::ForeignKey { to } | Self::ManyToMany { to, .. } => Some(to),
			_ => None,
		}
	}

	/// Returns true for relation kinds.
	pub fn is_relation(&self) -> bool {
		self.relation_target().is_some()
	}

	/// Human readable kind name used in diagnostics.
	pub fn name(&self) -> &'static str {
		match self {
			Self::Integer => "integer",
			Self::Float => "float",
			Self::String => "string",
			Self::Boolean => "boolean",
			Self::DateTime => "datetime",
			Self::Date => "date",
			Self::ForeignKey { .. } => "foreign key",
			Self::ManyToMany { .. } => "many-to-many",
		}
	}
}

/// A single field of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
	/// Field name.
	pub name: String,
	/// Declared kind.
	pub kind: FieldKind,
	/// Whether the field accepts null.
	pub nullable: bool,
}

impl FieldDescriptor {
	/// Creates a non-nullable field.
	pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
		Self {
			name: name.into(),
			kind,
			nullable: false,
		}
	}

	/// Marks the field as nullable.
	pub fn nullable(mut self) -> Self {
		self.nullable = true;
		self
	}
}

/// Natural key declaration of a record type.
///
/// The natural key of an instance is the tuple of its `fields` values.
/// `dependencies` lists the models that must be present before that tuple
/// can be resolved; it is independent of relation fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NaturalKey {
	/// Fields projected into the key, in order.
	pub fields: Vec<String>,
	/// Explicitly declared dependencies.
	pub dependencies: Vec<ModelId>,
}

impl NaturalKey {
	/// Number of values in the key tuple.
	pub fn arity(&self) -> usize {
		self.fields.len()
	}
}

/// Static description of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
	id: ModelId,
	fields: Vec<FieldDescriptor>,
	natural_key: Option<NaturalKey>,
	storage_alias: Option<ModelId>,
	ordering: Vec<String>,
}

impl RecordType {
	/// Starts building a record type.
	///
	/// # Example
	///
	/// ```
	/// # use reinhardt_fixtures::model::{FieldKind, RecordType};
	/// let store = RecordType::builder("fixtures_regress", "Store")
	///     .field("name", FieldKind::String)
	///     .natural_key(["name"])
	///     .ordering(["name"])
	///     .build()
	///     .unwrap();
	/// assert!(store.has_natural_key());
	/// assert_eq!(store.id().to_string(), "fixtures_regress.Store");
	/// ```
	pub fn builder(app_label: impl Into<String>, model_name: impl Into<String>) -> RecordTypeBuilder {
		RecordTypeBuilder {
			id: ModelId::new(app_label, model_name),
			fields: Vec::new(),
			natural_key: None,
			storage_alias: None,
			ordering: Vec::new(),
			pending: Vec::new(),
		}
	}

	/// Model identifier.
	pub fn id(&self) -> &ModelId {
		&self.id
	}

	/// Declared fields in order.
	pub fn fields(&self) -> &[FieldDescriptor] {
		&self.fields
	}

	/// Looks up a field by name.
	pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
		self.fields.iter().find(|f| f.name == name)
	}

	/// Relation fields in declaration order.
	pub fn relation_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
		self.fields.iter().filter(|f| f.kind.is_relation())
	}

	/// Natural key declaration.
	pub fn natural_key(&self) -> Option<&NaturalKey> {
		self.natural_key.as_ref()
	}

	/// Returns true if instances can be identified by natural key.
	pub fn has_natural_key(&self) -> bool {
		self.natural_key.is_some()
	}

	/// Model whose storage this type reflects, if it is a proxy.
	pub fn storage_alias(&self) -> Option<&ModelId> {
		self.storage_alias.as_ref()
	}

	/// Fields defining the natural ordering of instances.
	pub fn ordering(&self) -> &[String] {
		&self.ordering
	}

	/// Computes the natural key of an instance of this type.
	///
	/// Returns `None` when the type has no natural key or the instance lacks
	/// one of the key fields.
	pub fn natural_key_of(&self, record: &Record) -> Option<NaturalKeyValue> {
		let natural_key = self.natural_key.as_ref()?;
		natural_key
			.fields
			.iter()
			.map(|name| record.fields.get(name).cloned())
			.collect::<Option<Vec<_>>>()
			.map(NaturalKeyValue)
	}

	/// Compares two instances by this type's ordering fields.
	///
	/// Instances missing an ordering field sort first. Types without
	/// ordering treat all instances as equal.
	pub fn compare(&self, a: &Record, b: &Record) -> std::cmp::Ordering {
		self.ordering
			.iter()
			.map(|field| match (a.get(field), b.get(field)) {
				(Some(x), Some(y)) => x.ordering_cmp(y),
				(x, y) => x.is_some().cmp(&y.is_some()),
			})
			.find(|ord| ord.is_ne())
			.unwrap_or(std::cmp::Ordering::Equal)
	}

	/// Models referenced by relation fields that imply an ordering
	/// dependency.
	///
	/// Many-to-many relations through an explicit join model are left out:
	/// the join model carries the foreign keys itself. References back to
	/// this type are left out as well.
	pub fn relation_dependencies(&self) -> impl Iterator<Item = &ModelId> {
		self.fields.iter().filter_map(move |field| match &field.kind {
			FieldKind::ForeignKey { to } if *to != self.id => Some(to),
			FieldKind::ManyToMany { to, through: None } if *to != self.id => Some(to),
			_ => None,
		})
	}
}

/// Builder for [`RecordType`].
#[derive(Debug)]
pub struct RecordTypeBuilder {
	id: ModelId,
	fields: Vec<FieldDescriptor>,
	natural_key: Option<NaturalKey>,
	storage_alias: Option<ModelId>,
	ordering: Vec<String>,
	pending: Vec<String>,
}

impl RecordTypeBuilder {
	/// Adds a non-nullable field.
	pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
		self.fields.push(FieldDescriptor::new(name, kind));
		self
	}

	/// Adds a nullable field.
	pub fn nullable_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
		self.fields.push(FieldDescriptor::new(name, kind).nullable());
		self
	}

	/// Adds a foreign key to `to` (`app.Model`).
	pub fn foreign_key(self, name: impl Into<String>, to: &str) -> Self {
		match ModelId::parse(to) {
			Ok(to) => self.field(name, FieldKind::ForeignKey { to }),
			Err(_) => self.invalid(to),
		}
	}

	/// Adds a nullable foreign key to `to` (`app.Model`).
	pub fn nullable_foreign_key(self, name: impl Into<String>, to: &str) -> Self {
		match ModelId::parse(to) {
			Ok(to) => self.nullable_field(name, FieldKind::ForeignKey { to }),
			Err(_) => self.invalid(to),
		}
	}

	/// Adds a many-to-many relation to `to` (`app.Model`).
	pub fn many_to_many(self, name: impl Into<String>, to: &str) -> Self {
		match ModelId::parse(to) {
			Ok(to) => self.field(name, FieldKind::ManyToMany { to, through: None }),
			Err(_) => self.invalid(to),
		}
	}

	/// Adds a many-to-many relation to `to` stored in the `through` model.
	pub fn many_to_many_through(self, name: impl Into<String>, to: &str, through: &str) -> Self {
		match (ModelId::parse(to), ModelId::parse(through)) {
			(Ok(to), Ok(through)) => self.field(
				name,
				FieldKind::ManyToMany {
					to,
					through: Some(through),
				},
			),
			(Err(_), _) => self.invalid(to),
			(_, Err(_)) => self.invalid(through),
		}
	}

	/// Declares the natural key fields.
	pub fn natural_key<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let natural_key = self.natural_key.get_or_insert_with(NaturalKey::default);
		natural_key.fields = fields.into_iter().map(Into::into).collect();
		self
	}

	/// Declares models the natural key depends on.
	///
	/// Only meaningful together with [`natural_key`](Self::natural_key).
	pub fn natural_key_dependencies<I, S>(mut self, dependencies: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut parsed = Vec::new();
		for dependency in dependencies {
			match ModelId::parse(dependency.as_ref()) {
				Ok(id) => parsed.push(id),
				Err(_) => self.pending.push(dependency.as_ref().to_string()),
			}
		}
		self.natural_key
			.get_or_insert_with(NaturalKey::default)
			.dependencies
			.extend(parsed);
		self
	}

	/// Marks this type as a proxy over `target`'s storage.
	pub fn storage_alias_of(mut self, target: &str) -> Self {
		match ModelId::parse(target) {
			Ok(id) => self.storage_alias = Some(id),
			Err(_) => self.pending.push(target.to_string()),
		}
		self
	}

	/// Sets the fields defining the natural ordering.
	pub fn ordering<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.ordering = fields.into_iter().map(Into::into).collect();
		self
	}

	fn invalid(mut self, identifier: &str) -> Self {
		self.pending.push(identifier.to_string());
		self
	}

	/// Validates the declaration and builds the record type.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Validation`] when a referenced model
	/// identifier is malformed, a field is declared twice, a natural key is
	/// empty or names an unknown field, or an ordering field is unknown.
	pub fn build(self) -> FixtureResult<RecordType> {
		let invalid = |message: String| FixtureError::Validation {
			field: self.id.to_string(),
			message,
		};

		if let Some(identifier) = self.pending.first() {
			return Err(invalid(format!(
				"Model identifier '{}' must be in 'app.Model' format",
				identifier
			)));
		}

		for (idx, field) in self.fields.iter().enumerate() {
			if self.fields[..idx].iter().any(|f| f.name == field.name) {
				return Err(invalid(format!("Field '{}' declared twice", field.name)));
			}
		}

		if let Some(natural_key) = &self.natural_key {
			if natural_key.fields.is_empty() {
				return Err(invalid("Natural key must name at least one field".to_string()));
			}
			for name in &natural_key.fields {
				match self.fields.iter().find(|f| &f.name == name) {
					Some(field) if matches!(field.kind, FieldKind::ManyToMany { .. }) => {
						return Err(invalid(format!(
							"Natural key field '{}' cannot be many-to-many",
							name
						)));
					}
					Some(_) => {}
					None => {
						return Err(invalid(format!("Natural key field '{}' is not declared", name)));
					}
				}
			}
		}

		for name in &self.ordering {
			if !self.fields.iter().any(|f| &f.name == name) {
				return Err(invalid(format!("Ordering field '{}' is not declared", name)));
			}
		}

		Ok(RecordType {
			id: self.id,
			fields: self.fields,
			natural_key: self.natural_key,
			storage_alias: self.storage_alias,
			ordering: self.ordering,
		})
	}

	/// Builds the record type wrapped in an [`Arc`].
	pub fn build_arc(self) -> FixtureResult<Arc<RecordType>> {
		self.build().map(Arc::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_model_id_case_insensitive() {
		let a = ModelId::parse("fixtures_regress.Store").unwrap();
		let b = ModelId::parse("fixtures_regress.store").unwrap();
		assert_eq!(a, b);
		assert_eq!(a.key(), b.key());
		assert_eq!(a.to_string(), "fixtures_regress.Store");
	}

	#[rstest]
	#[case("User")]
	#[case("a.b.c")]
	#[case(".User")]
	#[case("auth.")]
	fn test_model_id_rejects_malformed(#[case] input: &str) {
		assert!(matches!(
			ModelId::parse(input),
			Err(FixtureError::MalformedRecord { .. })
		));
	}

	#[rstest]
	fn test_relation_dependencies_skip_self_and_through() {
		let tagger = RecordType::builder("fixtures_regress", "Tagger")
			.field("name", FieldKind::String)
			.nullable_foreign_key("mentor", "fixtures_regress.Tagger")
			.many_to_many_through("topics", "fixtures_regress.Tag", "fixtures_regress.TaggerTag")
			.foreign_key("home", "fixtures_regress.Store")
			.natural_key(["name"])
			.build()
			.unwrap();

		let deps: Vec<String> = tagger
			.relation_dependencies()
			.map(|id| id.to_string())
			.collect();
		assert_eq!(deps, vec!["fixtures_regress.Store"]);
	}

	#[rstest]
	fn test_build_rejects_unknown_natural_key_field() {
		let result = RecordType::builder("app", "Thing")
			.field("name", FieldKind::String)
			.natural_key(["code"])
			.build();
		assert!(matches!(result, Err(FixtureError::Validation { .. })));
	}

	#[rstest]
	fn test_build_rejects_malformed_relation_target() {
		let result = RecordType::builder("app", "Thing")
			.foreign_key("owner", "User")
			.build();
		assert!(matches!(result, Err(FixtureError::Validation { .. })));
	}

	#[rstest]
	fn test_build_rejects_duplicate_field() {
		let result = RecordType::builder("app", "Thing")
			.field("name", FieldKind::String)
			.field("name", FieldKind::Integer)
			.build();
		assert!(matches!(result, Err(FixtureError::Validation { .. })));
	}

	#[rstest]
	fn test_natural_key_of() {
		let person = RecordType::builder("fixtures_regress", "Person")
			.field("name", FieldKind::String)
			.natural_key(["name"])
			.natural_key_dependencies(["fixtures_regress.store"])
			.build()
			.unwrap();

		let mut record = Record::new(person.id().clone());
		record.set("name", FieldValue::String("Neal Stephenson".to_string()));

		let key = person.natural_key_of(&record).unwrap();
		assert_eq!(
			key,
			NaturalKeyValue(vec![FieldValue::String("Neal Stephenson".to_string())])
		);
		assert_eq!(
			person.natural_key().unwrap().dependencies,
			vec![ModelId::new("fixtures_regress", "Store")]
		);
	}
}
