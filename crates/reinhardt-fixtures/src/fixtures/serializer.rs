//! Record serialization for fixture output.
//!
//! This module reads records through a [`RecordStore`] and turns them into
//! [`FixtureRecord`]s, writing relations either as surrogate ids or as the
//! natural keys of their targets.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::{FixtureRecord, JsonFormat, SerializationFormat};
use crate::error::FixtureResult;
use crate::model::{FieldKind, FieldValue, ModelId, Record, RecordType, SurrogateId, TypeRegistry};
use crate::resolver::sort_dependencies;
use crate::store::RecordStore;

/// Options controlling which records are serialized and how relations are
/// written.
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
	/// Write relations as natural keys where the target has one, and order
	/// types by their natural-key dependencies.
	pub use_natural_keys: bool,

	/// Types requested explicitly. `None` means every given type counts as
	/// requested.
	pub selected_types: Option<Vec<ModelId>>,
}

impl SerializeOptions {
	/// Creates default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets whether to use natural keys.
	pub fn with_natural_keys(mut self, use_natural_keys: bool) -> Self {
		self.use_natural_keys = use_natural_keys;
		self
	}

	/// Sets the explicitly requested types.
	pub fn with_selected_types(mut self, types: impl IntoIterator<Item = ModelId>) -> Self {
		self.selected_types = Some(types.into_iter().collect());
		self
	}

	/// Returns true if `id` was requested explicitly.
	pub fn is_selected(&self, id: &ModelId) -> bool {
		self.selected_types
			.as_ref()
			.is_none_or(|selected| selected.contains(id))
	}
}

/// Fixture serializer for exporting stored records.
#[derive(Clone)]
pub struct FixtureSerializer {
	/// Output format.
	format: Arc<dyn SerializationFormat>,

	/// Indentation level for pretty printing.
	indent: usize,
}

impl FixtureSerializer {
	/// Creates a new fixture serializer writing indented JSON.
	pub fn new() -> Self {
		Self {
			format: Arc::new(JsonFormat),
			indent: 2,
		}
	}

	/// Sets the output format.
	pub fn with_format(mut self, format: Arc<dyn SerializationFormat>) -> Self {
		self.format = format;
		self
	}

	/// Sets the indentation level. 0 produces compact output.
	pub fn with_indent(mut self, indent: usize) -> Self {
		self.indent = indent;
		self
	}

	/// Returns the configured output format.
	pub fn format(&self) -> &dyn SerializationFormat {
		self.format.as_ref()
	}

	/// Returns the configured indentation level.
	pub fn indent(&self) -> usize {
		self.indent
	}

	/// Collects the records of `types` from `store`.
	///
	/// Types are grouped by app label in first-seen order. With natural keys
	/// enabled they are then ordered by [`sort_dependencies`]. A storage alias
	/// is left out when the type owning its storage is serialized as well, or
	/// when it was not requested explicitly.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::CyclicDependency`](crate::error::FixtureError::CyclicDependency)
	/// when natural-key dependencies cannot be ordered, or any store error.
	pub fn serialize_types(
		&self,
		registry: &TypeRegistry,
		store: &dyn RecordStore,
		types: &[Arc<RecordType>],
		options: &SerializeOptions,
	) -> FixtureResult<Vec<FixtureRecord>> {
		let mut app_list: Vec<(String, Vec<Arc<RecordType>>)> = Vec::new();
		for record_type in types {
			let app = record_type.id().app_label().to_ascii_lowercase();
			match app_list.iter_mut().find(|(label, _)| *label == app) {
				Some((_, models)) => models.push(record_type.clone()),
				None => app_list.push((app, vec![record_type.clone()])),
			}
		}

		let ordered = if options.use_natural_keys {
			sort_dependencies(&app_list)?
		} else {
			let mut seen = HashSet::new();
			app_list
				.into_iter()
				.flat_map(|(_, models)| models)
				.filter(|rt| seen.insert(rt.id().key()))
				.collect()
		};

		let members: HashSet<String> = ordered.iter().map(|rt| rt.id().key()).collect();
		let mut records = Vec::new();

		for record_type in &ordered {
			if let Some(owner) = store.storage_alias(record_type) {
				if members.contains(&owner.key()) {
					tracing::debug!(
						model = %record_type.id(),
						owner = %owner,
						"skipping alias of serialized model"
					);
					continue;
				}
				if !options.is_selected(record_type.id()) {
					tracing::debug!(
						model = %record_type.id(),
						"skipping alias not requested explicitly"
					);
					continue;
				}
			}

			for record in store.default_view(record_type)? {
				records.push(self.encode(registry, store, record_type, &record, options)?);
			}
		}

		tracing::info!(models = ordered.len(), records = records.len(), "serialized records");
		Ok(records)
	}

	/// Converts one stored record to a fixture record.
	pub fn encode(
		&self,
		registry: &TypeRegistry,
		store: &dyn RecordStore,
		record_type: &RecordType,
		record: &Record,
		options: &SerializeOptions,
	) -> FixtureResult<FixtureRecord> {
		let mut fields = Map::new();

		for field in record_type.fields() {
			let Some(value) = record.get(&field.name) else {
				continue;
			};

			let encoded = match (&field.kind, value) {
				(FieldKind::ForeignKey { to }, FieldValue::Ref(id)) => {
					self.reference(registry, store, to, id, options)?
				}
				(FieldKind::ManyToMany { to, .. }, FieldValue::RefList(ids)) => {
					self.references(registry, store, to, ids, options)?
				}
				(_, other) => other.to_json(),
			};
			fields.insert(field.name.clone(), encoded);
		}

		Ok(FixtureRecord {
			model: record_type.id().key(),
			pk: record.pk.as_ref().map(SurrogateId::to_json),
			fields: Value::Object(fields),
		})
	}

	fn reference(
		&self,
		registry: &TypeRegistry,
		store: &dyn RecordStore,
		target: &ModelId,
		id: &SurrogateId,
		options: &SerializeOptions,
	) -> FixtureResult<Value> {
		if options.use_natural_keys {
			return related_key_json(registry, store, target, id);
		}
		Ok(id.to_json())
	}

	fn references(
		&self,
		registry: &TypeRegistry,
		store: &dyn RecordStore,
		target: &ModelId,
		ids: &[SurrogateId],
		options: &SerializeOptions,
	) -> FixtureResult<Value> {
		let Some(target_type) = registry.get(target) else {
			return Ok(Value::Array(ids.iter().map(SurrogateId::to_json).collect()));
		};

		let mut targets: Vec<(SurrogateId, Option<Record>)> = Vec::with_capacity(ids.len());
		for id in ids {
			targets.push((id.clone(), store.get(&target_type, id)?));
		}

		targets.sort_by(|(a_id, a), (b_id, b)| match (a, b) {
			(Some(a), Some(b)) => target_type.compare(a, b).then_with(|| a_id.cmp(b_id)),
			(a, b) => b.is_some().cmp(&a.is_some()).then_with(|| a_id.cmp(b_id)),
		});

		let mut encoded = Vec::with_capacity(targets.len());
		for (id, record) in targets {
			let key = match record {
				Some(record) if options.use_natural_keys => {
					natural_key_json(registry, store, &target_type, &record)?
				}
				_ => None,
			};
			encoded.push(key.unwrap_or_else(|| id.to_json()));
		}

		Ok(Value::Array(encoded))
	}

	/// Renders fixture records to a string.
	pub fn serialize(&self, records: &[FixtureRecord]) -> FixtureResult<String> {
		self.format.render(records, self.indent)
	}

	/// Renders fixture records into a writer.
	pub fn write_to<W: Write + ?Sized>(
		&self,
		records: &[FixtureRecord],
		sink: &mut W,
	) -> FixtureResult<()> {
		let content = self.serialize(records)?;
		sink.write_all(content.as_bytes())?;
		Ok(())
	}

	/// Writes serialized fixtures to a file.
	pub fn write_to_file(&self, records: &[FixtureRecord], path: &Path) -> FixtureResult<()> {
		let content = self.serialize(records)?;
		std::fs::write(path, content)?;
		Ok(())
	}
}

impl Default for FixtureSerializer {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for FixtureSerializer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FixtureSerializer")
			.field("format", &self.format.name())
			.field("indent", &self.indent)
			.finish()
	}
}

/// Renders the natural key of `record` as JSON.
///
/// Key fields that are foreign keys are written as the related instance's
/// natural key, recursively, so the output never depends on surrogate ids
/// that differ between databases.
fn natural_key_json(
	registry: &TypeRegistry,
	store: &dyn RecordStore,
	record_type: &RecordType,
	record: &Record,
) -> FixtureResult<Option<Value>> {
	let Some(natural_key) = record_type.natural_key() else {
		return Ok(None);
	};

	let mut components = Vec::with_capacity(natural_key.arity());
	for name in &natural_key.fields {
		let Some(value) = record.get(name) else {
			return Ok(None);
		};
		let component = match (record_type.field(name).map(|f| &f.kind), value) {
			(Some(FieldKind::ForeignKey { to }), FieldValue::Ref(id)) => {
				related_key_json(registry, store, to, id)?
			}
			_ => value.to_json(),
		};
		components.push(component);
	}
	Ok(Some(Value::Array(components)))
}

/// Renders a reference to `target` by natural key, falling back to the
/// surrogate id when the target has no natural key or cannot be read.
fn related_key_json(
	registry: &TypeRegistry,
	store: &dyn RecordStore,
	target: &ModelId,
	id: &SurrogateId,
) -> FixtureResult<Value> {
	if let Some(target_type) = registry.get(target)
		&& let Some(record) = store.get(&target_type, id)?
		&& let Some(key) = natural_key_json(registry, store, &target_type, &record)?
	{
		return Ok(key);
	}
	Ok(id.to_json())
}
