//! In-memory record store.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use super::RecordStore;
use crate::error::{FixtureError, FixtureResult};
use crate::model::{ModelId, NaturalKeyValue, Record, RecordType, SurrogateId};

type Tables = HashMap<String, BTreeMap<SurrogateId, Record>>;

#[derive(Debug, Default)]
struct State {
	tables: Tables,
	// One snapshot per open transaction, innermost last.
	snapshots: Vec<Tables>,
}

/// A [`RecordStore`] keeping everything in process memory.
///
/// Transactions are implemented with snapshots and may be nested. Integer
/// primary keys are assigned after the largest integer key already stored,
/// so loading a record with pk 10 makes the next created record pk 11.
#[derive(Debug, Default)]
pub struct MemoryStore {
	state: Mutex<State>,
}

impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of records stored for `model`.
	pub fn count(&self, model: &ModelId) -> usize {
		self.state
			.lock()
			.tables
			.get(&model.key())
			.map_or(0, BTreeMap::len)
	}

	/// Returns true while a transaction is open.
	pub fn in_transaction(&self) -> bool {
		!self.state.lock().snapshots.is_empty()
	}

	fn table_key(record_type: &RecordType) -> String {
		record_type
			.storage_alias()
			.unwrap_or_else(|| record_type.id())
			.key()
	}
}

impl RecordStore for MemoryStore {
	fn find(
		&self,
		record_type: &RecordType,
		key: &NaturalKeyValue,
	) -> FixtureResult<Option<SurrogateId>> {
		let state = self.state.lock();
		let Some(table) = state.tables.get(&Self::table_key(record_type)) else {
			return Ok(None);
		};
		Ok(table
			.iter()
			.find(|(_, record)| record_type.natural_key_of(record).as_ref() == Some(key))
			.map(|(pk, _)| pk.clone()))
	}

	fn get(&self, record_type: &RecordType, pk: &SurrogateId) -> FixtureResult<Option<Record>> {
		let state = self.state.lock();
		Ok(state
			.tables
			.get(&Self::table_key(record_type))
			.and_then(|table| table.get(pk))
			.map(|record| Record {
				model: record_type.id().clone(),
				..record.clone()
			}))
	}

	fn create(&self, record_type: &RecordType, mut record: Record) -> FixtureResult<SurrogateId> {
		let mut state = self.state.lock();
		let table = state
			.tables
			.entry(Self::table_key(record_type))
			.or_default();

		let pk = match record.pk.clone() {
			Some(pk) => pk,
			None => {
				let next = table
					.keys()
					.filter_map(|pk| match pk {
						SurrogateId::Int(i) => Some(*i),
						_ => None,
					})
					.max()
					.unwrap_or(0)
					.checked_add(1)
					.ok_or_else(|| FixtureError::Store("integer primary keys exhausted".to_string()))?;
				SurrogateId::Int(next)
			}
		};

		record.pk = Some(pk.clone());
		table.insert(pk.clone(), record);
		Ok(pk)
	}

	fn default_view(&self, record_type: &RecordType) -> FixtureResult<Vec<Record>> {
		let state = self.state.lock();
		let mut records: Vec<Record> = state
			.tables
			.get(&Self::table_key(record_type))
			.map(|table| {
				table
					.values()
					.map(|record| Record {
						model: record_type.id().clone(),
						..record.clone()
					})
					.collect()
			})
			.unwrap_or_default();

		if !record_type.ordering().is_empty() {
			records.sort_by(|a, b| record_type.compare(a, b));
		}

		Ok(records)
	}

	fn begin(&self) -> FixtureResult<()> {
		let mut state = self.state.lock();
		let snapshot = state.tables.clone();
		state.snapshots.push(snapshot);
		Ok(())
	}

	fn commit(&self) -> FixtureResult<()> {
		self.state
			.lock()
			.snapshots
			.pop()
			.map(|_| ())
			.ok_or_else(|| FixtureError::Store("commit without an active transaction".to_string()))
	}

	fn rollback(&self) -> FixtureResult<()> {
		let mut state = self.state.lock();
		let snapshot = state.snapshots.pop().ok_or_else(|| {
			FixtureError::Store("rollback without an active transaction".to_string())
		})?;
		state.tables = snapshot;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::{FieldKind, FieldValue};
	use rstest::rstest;

	fn animal() -> RecordType {
		RecordType::builder("fixtures_regress", "Animal")
			.field("name", FieldKind::String)
			.field("count", FieldKind::Integer)
			.natural_key(["name"])
			.ordering(["name"])
			.build()
			.unwrap()
	}

	fn named(rt: &RecordType, pk: Option<i64>, name: &str) -> Record {
		let mut record = Record::new(rt.id().clone());
		record.pk = pk.map(SurrogateId::Int);
		record.with_field("name", FieldValue::String(name.to_string()))
	}

	#[rstest]
	fn test_auto_pk_follows_largest_loaded() {
		let store = MemoryStore::new();
		let rt = animal();

		store.create(&rt, named(&rt, Some(10), "Emu")).unwrap();
		let pk = store.create(&rt, named(&rt, None, "Platypus")).unwrap();
		assert_eq!(pk, SurrogateId::Int(11));
	}

	#[rstest]
	fn test_create_with_pk_replaces() {
		let store = MemoryStore::new();
		let rt = animal();

		store.create(&rt, named(&rt, Some(1), "Lion")).unwrap();
		store.create(&rt, named(&rt, Some(1), "Tiger")).unwrap();

		assert_eq!(store.count(rt.id()), 1);
		let record = store.get(&rt, &SurrogateId::Int(1)).unwrap().unwrap();
		assert_eq!(record.get("name"), Some(&FieldValue::String("Tiger".into())));
	}

	#[rstest]
	fn test_find_by_natural_key() {
		let store = MemoryStore::new();
		let rt = animal();
		store.create(&rt, named(&rt, Some(3), "Lion")).unwrap();

		let key = NaturalKeyValue(vec![FieldValue::String("Lion".into())]);
		assert_eq!(store.find(&rt, &key).unwrap(), Some(SurrogateId::Int(3)));

		let missing = NaturalKeyValue(vec![FieldValue::String("Yeti".into())]);
		assert_eq!(store.find(&rt, &missing).unwrap(), None);
	}

	#[rstest]
	fn test_default_view_uses_ordering() {
		let store = MemoryStore::new();
		let rt = animal();
		store.create(&rt, named(&rt, Some(1), "Zebra")).unwrap();
		store.create(&rt, named(&rt, Some(2), "Aardvark")).unwrap();

		let names: Vec<FieldValue> = store
			.default_view(&rt)
			.unwrap()
			.into_iter()
			.filter_map(|r| r.get("name").cloned())
			.collect();
		assert_eq!(
			names,
			vec![
				FieldValue::String("Aardvark".into()),
				FieldValue::String("Zebra".into())
			]
		);
	}

	#[rstest]
	fn test_alias_reads_owner_storage() {
		let store = MemoryStore::new();
		let widget = RecordType::builder("fixtures_regress", "Widget")
			.field("name", FieldKind::String)
			.build()
			.unwrap();
		let proxy = RecordType::builder("fixtures_regress", "WidgetProxy")
			.field("name", FieldKind::String)
			.storage_alias_of("fixtures_regress.Widget")
			.build()
			.unwrap();

		store
			.create(
				&widget,
				Record::new(widget.id().clone())
					.with_field("name", FieldValue::String("grommet".into())),
			)
			.unwrap();

		let through_proxy = store.default_view(&proxy).unwrap();
		assert_eq!(through_proxy.len(), 1);
		assert_eq!(through_proxy[0].model, *proxy.id());
	}

	#[rstest]
	fn test_nested_transactions() {
		let store = MemoryStore::new();
		let rt = animal();

		store.begin().unwrap();
		store.create(&rt, named(&rt, None, "Lion")).unwrap();
		store.begin().unwrap();
		store.create(&rt, named(&rt, None, "Tiger")).unwrap();
		store.rollback().unwrap();
		assert_eq!(store.count(rt.id()), 1);
		store.commit().unwrap();

		assert!(!store.in_transaction());
		assert_eq!(store.count(rt.id()), 1);
		assert!(matches!(store.commit(), Err(FixtureError::Store(_))));
	}
}
