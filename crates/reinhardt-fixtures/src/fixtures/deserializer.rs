//! Record deserialization.
//!
//! Turns parsed [`FixtureRecord`]s into typed [`Record`]s: scalar values are
//! coerced to the declared field kinds and natural-key references are
//! resolved against the record store. The deserializer never writes; the
//! caller persists each record before pulling the next one, which lets later
//! records refer to earlier ones by natural key.

use serde_json::{Map, Value};

use super::FixtureRecord;
use crate::error::{FixtureError, FixtureResult};
use crate::model::{
	FieldDescriptor, FieldKind, FieldValue, ModelId, NaturalKeyValue, Record, RecordType,
	SurrogateId, TypeRegistry,
};
use crate::store::RecordStore;

/// Lazy, single-pass iterator over deserialized records.
///
/// Records are produced in input order. Each item is independent: after an
/// error the iterator can keep going with the next record.
///
/// # Example
///
/// ```
/// use reinhardt_fixtures::fixtures::{Deserializer, FixtureRecord};
/// use reinhardt_fixtures::model::{FieldKind, FieldValue, RecordType, TypeRegistry};
/// use reinhardt_fixtures::store::MemoryStore;
/// use serde_json::json;
///
/// let registry = TypeRegistry::new();
/// registry.register(
///     RecordType::builder("zoo", "Animal")
///         .field("count", FieldKind::Integer)
///         .build()
///         .unwrap(),
/// );
/// let store = MemoryStore::new();
/// let input = vec![FixtureRecord::new("zoo.animal", json!({"count": "3"}))];
///
/// let records: Vec<_> = Deserializer::new(&registry, &store, input)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(records[0].get("count"), Some(&FieldValue::Integer(3)));
/// ```
pub struct Deserializer<'a> {
	registry: &'a TypeRegistry,
	store: &'a dyn RecordStore,
	records: std::vec::IntoIter<FixtureRecord>,
	ignore_unknown_fields: bool,
	position: usize,
}

impl<'a> Deserializer<'a> {
	/// Creates a deserializer over `records`.
	pub fn new(
		registry: &'a TypeRegistry,
		store: &'a dyn RecordStore,
		records: Vec<FixtureRecord>,
	) -> Self {
		Self {
			registry,
			store,
			records: records.into_iter(),
			ignore_unknown_fields: false,
			position: 0,
		}
	}

	/// Skips fields the record type does not declare instead of failing.
	pub fn with_ignore_unknown_fields(mut self, ignore: bool) -> Self {
		self.ignore_unknown_fields = ignore;
		self
	}

	/// Number of records pulled so far.
	pub fn position(&self) -> usize {
		self.position
	}

	fn deserialize(&self, fixture: FixtureRecord) -> FixtureResult<Record> {
		let record_type = self.registry.resolve(&fixture.model)?;
		let model = record_type.id().to_string();

		let Value::Object(raw_fields) = &fixture.fields else {
			return Err(FixtureError::malformed(&model, "Fields must be a JSON object"));
		};

		let mut record = Record::new(record_type.id().clone());
		record.pk = match &fixture.pk {
			None | Some(Value::Null) => None,
			Some(raw) => Some(SurrogateId::from_json(raw).ok_or_else(|| {
				FixtureError::malformed(&model, format!("Invalid primary key {}", raw))
			})?),
		};

		for (name, raw) in raw_fields {
			let Some(field) = record_type.field(name) else {
				if self.ignore_unknown_fields {
					tracing::debug!(model = %model, field = %name, "ignoring undeclared field");
					continue;
				}
				return Err(FixtureError::malformed(
					&model,
					format!("Field '{}' is not declared", name),
				));
			};

			let value = self.field_value(&record_type, field, raw, raw_fields)?;
			record.set(name.clone(), value);
		}

		tracing::debug!(model = %model, pk = ?record.pk, "deserialized record");
		Ok(record)
	}

	fn field_value(
		&self,
		record_type: &RecordType,
		field: &FieldDescriptor,
		raw: &Value,
		raw_fields: &Map<String, Value>,
	) -> FixtureResult<FieldValue> {
		let invalid = || FixtureError::InvalidFieldValue {
			model: record_type.id().to_string(),
			field: field.name.clone(),
			expected: field.kind.name().to_string(),
			value: raw.to_string(),
		};

		if raw.is_null() {
			return if field.nullable && !matches!(field.kind, FieldKind::ManyToMany { .. }) {
				Ok(FieldValue::Null)
			} else {
				Err(invalid())
			};
		}

		match &field.kind {
			FieldKind::ForeignKey { to } => match raw {
				Value::Array(key) => {
					match self.resolve_natural_key(record_type, field, to, key, raw_fields)? {
						Some(id) => Ok(FieldValue::Ref(id)),
						None => Ok(FieldValue::Null),
					}
				}
				scalar => SurrogateId::from_json(scalar)
					.map(FieldValue::Ref)
					.ok_or_else(invalid),
			},
			FieldKind::ManyToMany { to, .. } => {
				let Value::Array(items) = raw else {
					return Err(invalid());
				};
				let mut ids = Vec::with_capacity(items.len());
				for item in items {
					let id = match item {
						Value::Array(key) => self
							.resolve_natural_key(record_type, field, to, key, raw_fields)?
							.ok_or_else(|| self.dangling(record_type, field, to, key, raw_fields))?,
						scalar => SurrogateId::from_json(scalar).ok_or_else(invalid)?,
					};
					ids.push(id);
				}
				Ok(FieldValue::RefList(ids))
			}
			kind => FieldValue::from_json(raw)
				.and_then(|value| value.coerce_to(kind))
				.ok_or_else(invalid),
		}
	}

	/// Resolves a natural-key reference.
	///
	/// Returns `Ok(None)` only for a nullable foreign key whose target is
	/// missing.
	fn resolve_natural_key(
		&self,
		record_type: &RecordType,
		field: &FieldDescriptor,
		target: &ModelId,
		raw_key: &[Value],
		raw_fields: &Map<String, Value>,
	) -> FixtureResult<Option<SurrogateId>> {
		match self.find_by_natural_key(record_type.id(), &field.name, target, raw_key)? {
			Some(id) => {
				tracing::debug!(
					model = %record_type.id(),
					field = %field.name,
					target = %target,
					pk = %id,
					"resolved natural key"
				);
				Ok(Some(id))
			}
			None if field.nullable && matches!(field.kind, FieldKind::ForeignKey { .. }) => {
				tracing::debug!(
					model = %record_type.id(),
					field = %field.name,
					target = %target,
					"natural key not found, storing null"
				);
				Ok(None)
			}
			None => Err(self.dangling(record_type, field, target, raw_key, raw_fields)),
		}
	}

	/// Looks up an instance of `target` by its natural key.
	///
	/// A key component that is itself a foreign key may be given as the
	/// related instance's natural key; it is resolved first, recursively.
	/// Any miss along the way yields `Ok(None)`.
	fn find_by_natural_key(
		&self,
		owner: &ModelId,
		field: &str,
		target: &ModelId,
		raw_key: &[Value],
	) -> FixtureResult<Option<SurrogateId>> {
		let target_type = self
			.registry
			.get(target)
			.ok_or_else(|| FixtureError::UnknownType(target.to_string()))?;

		let Some(natural_key) = target_type.natural_key() else {
			return Err(FixtureError::malformed(
				owner.to_string(),
				format!("Field '{}' uses a natural key but {} has none", field, target),
			));
		};

		if raw_key.len() != natural_key.arity() {
			return Err(FixtureError::malformed(
				owner.to_string(),
				format!(
					"Natural key for {} in field '{}' expects {} value(s), got {}",
					target,
					field,
					natural_key.arity(),
					raw_key.len()
				),
			));
		}

		let mut values = Vec::with_capacity(raw_key.len());
		for (key_field, raw) in natural_key.fields.iter().zip(raw_key) {
			let kind = target_type.field(key_field).map(|f| &f.kind).ok_or_else(|| {
				FixtureError::malformed(
					target.to_string(),
					format!("Field '{}' is not declared", key_field),
				)
			})?;

			if let (FieldKind::ForeignKey { to }, Value::Array(nested)) = (kind, raw) {
				match self.find_by_natural_key(target, key_field, to, nested)? {
					Some(id) => values.push(FieldValue::Ref(id)),
					None => return Ok(None),
				}
				continue;
			}

			let value = FieldValue::from_json(raw)
				.and_then(|v| v.coerce_to(kind))
				.ok_or_else(|| FixtureError::InvalidFieldValue {
					model: target.to_string(),
					field: key_field.clone(),
					expected: kind.name().to_string(),
					value: raw.to_string(),
				})?;
			values.push(value);
		}

		self.store.find(&target_type, &NaturalKeyValue(values))
	}

	fn dangling(
		&self,
		record_type: &RecordType,
		field: &FieldDescriptor,
		target: &ModelId,
		raw_key: &[Value],
		raw_fields: &Map<String, Value>,
	) -> FixtureError {
		// Best effort: the referencing record's own natural key, read from the
		// raw input since the record is not fully coerced yet.
		let record = record_type.natural_key().and_then(|nk| {
			nk.fields
				.iter()
				.map(|name| raw_fields.get(name).cloned())
				.collect::<Option<Vec<_>>>()
				.map(|values| Value::Array(values).to_string())
		});

		FixtureError::DanglingReference {
			model: record_type.id().to_string(),
			field: field.name.clone(),
			target: target.to_string(),
			key: Value::Array(raw_key.to_vec()).to_string(),
			record,
		}
	}
}

impl Iterator for Deserializer<'_> {
	type Item = FixtureResult<Record>;

	fn next(&mut self) -> Option<Self::Item> {
		let fixture = self.records.next()?;
		self.position += 1;
		Some(self.deserialize(fixture))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.records.size_hint()
	}
}

impl std::fmt::Debug for Deserializer<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Deserializer")
			.field("position", &self.position)
			.field("remaining", &self.records.len())
			.finish()
	}
}
