//! Record store abstraction.
//!
//! The fixture machinery never talks to a database directly. It reads and
//! writes through a [`RecordStore`], and wraps every loaded source in a
//! [`TransactionScope`] so that a source is committed entirely or not at all.

mod memory;

pub use memory::MemoryStore;

use crate::error::FixtureResult;
use crate::model::{ModelId, NaturalKeyValue, Record, RecordType, SurrogateId};

/// Storage collaborator used by the loader and the serializer.
///
/// Implementations are expected to provide read-your-writes consistency
/// inside one load: a record created through [`create`](Self::create) must
/// be visible to [`find`](Self::find) before the transaction commits.
pub trait RecordStore {
	/// Finds the instance of `record_type` whose natural key equals `key`.
	fn find(
		&self,
		record_type: &RecordType,
		key: &NaturalKeyValue,
	) -> FixtureResult<Option<SurrogateId>>;

	/// Fetches one instance by surrogate id.
	fn get(&self, record_type: &RecordType, pk: &SurrogateId) -> FixtureResult<Option<Record>>;

	/// Persists a record and returns its surrogate id.
	///
	/// A record carrying a primary key replaces any stored record with the
	/// same key.
	fn create(&self, record_type: &RecordType, record: Record) -> FixtureResult<SurrogateId>;

	/// Returns the instances visible through the type's default view, in
	/// the type's natural ordering.
	fn default_view(&self, record_type: &RecordType) -> FixtureResult<Vec<Record>>;

	/// Returns the model whose storage `record_type` reflects, if any.
	fn storage_alias(&self, record_type: &RecordType) -> Option<ModelId> {
		record_type.storage_alias().cloned()
	}

	/// Begins a transaction.
	fn begin(&self) -> FixtureResult<()>;

	/// Commits the innermost transaction.
	fn commit(&self) -> FixtureResult<()>;

	/// Rolls back the innermost transaction.
	fn rollback(&self) -> FixtureResult<()>;
}

/// A transaction held open for the lifetime of the scope.
///
/// Dropping the scope without calling [`commit`](Self::commit) rolls the
/// transaction back, so every early return through `?` discards the partial
/// load.
///
/// # Example
///
/// ```
/// use reinhardt_fixtures::store::{MemoryStore, RecordStore, TransactionScope};
///
/// let store = MemoryStore::new();
/// let scope = TransactionScope::begin(&store).unwrap();
/// // ... create records ...
/// scope.commit().unwrap();
/// ```
pub struct TransactionScope<'s> {
	store: &'s dyn RecordStore,
	committed: bool,
}

impl<'s> TransactionScope<'s> {
	/// Begins a new transaction on `store`.
	pub fn begin(store: &'s dyn RecordStore) -> FixtureResult<Self> {
		store.begin()?;
		Ok(Self {
			store,
			committed: false,
		})
	}

	/// Commits the transaction.
	///
	/// If the store rejects the commit the scope is still open and dropping
	/// it rolls the transaction back.
	pub fn commit(mut self) -> FixtureResult<()> {
		self.store.commit()?;
		self.committed = true;
		Ok(())
	}

	/// Rolls the transaction back explicitly.
	pub fn rollback(mut self) -> FixtureResult<()> {
		self.committed = true;
		self.store.rollback()
	}
}

impl Drop for TransactionScope<'_> {
	fn drop(&mut self) {
		if !self.committed {
			tracing::warn!("transaction scope dropped without commit, rolling back");
			if let Err(e) = self.store.rollback() {
				tracing::error!(error = %e, "rollback failed");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::FixtureError;
	use crate::model::{FieldKind, FieldValue};
	use rstest::rstest;

	/// Delegates to a [`MemoryStore`] but refuses every commit.
	struct RejectingCommit {
		inner: MemoryStore,
	}

	impl RecordStore for RejectingCommit {
		fn find(
			&self,
			record_type: &RecordType,
			key: &NaturalKeyValue,
		) -> FixtureResult<Option<SurrogateId>> {
			self.inner.find(record_type, key)
		}

		fn get(&self, record_type: &RecordType, pk: &SurrogateId) -> FixtureResult<Option<Record>> {
			self.inner.get(record_type, pk)
		}

		fn create(&self, record_type: &RecordType, record: Record) -> FixtureResult<SurrogateId> {
			self.inner.create(record_type, record)
		}

		fn default_view(&self, record_type: &RecordType) -> FixtureResult<Vec<Record>> {
			self.inner.default_view(record_type)
		}

		fn begin(&self) -> FixtureResult<()> {
			self.inner.begin()
		}

		fn commit(&self) -> FixtureResult<()> {
			Err(FixtureError::Store("commit rejected".to_string()))
		}

		fn rollback(&self) -> FixtureResult<()> {
			self.inner.rollback()
		}
	}

	fn animal() -> RecordType {
		RecordType::builder("fixtures_regress", "Animal")
			.field("name", FieldKind::String)
			.build()
			.unwrap()
	}

	fn lion(rt: &RecordType) -> Record {
		Record::with_pk(rt.id().clone(), 1).with_field("name", FieldValue::String("Lion".into()))
	}

	#[rstest]
	fn test_scope_commit_keeps_records() {
		let store = MemoryStore::new();
		let rt = animal();

		let scope = TransactionScope::begin(&store).unwrap();
		store.create(&rt, lion(&rt)).unwrap();
		scope.commit().unwrap();

		assert_eq!(store.default_view(&rt).unwrap().len(), 1);
	}

	#[rstest]
	fn test_scope_drop_rolls_back() {
		let store = MemoryStore::new();
		let rt = animal();

		{
			let _scope = TransactionScope::begin(&store).unwrap();
			store.create(&rt, lion(&rt)).unwrap();
			assert_eq!(store.default_view(&rt).unwrap().len(), 1);
		}

		assert!(store.default_view(&rt).unwrap().is_empty());
	}

	#[rstest]
	fn test_scope_explicit_rollback() {
		let store = MemoryStore::new();
		let rt = animal();

		let scope = TransactionScope::begin(&store).unwrap();
		store.create(&rt, lion(&rt)).unwrap();
		scope.rollback().unwrap();

		assert!(store.default_view(&rt).unwrap().is_empty());
	}

	#[rstest]
	fn test_failed_commit_rolls_back() {
		let store = RejectingCommit {
			inner: MemoryStore::new(),
		};
		let rt = animal();

		let scope = TransactionScope::begin(&store).unwrap();
		store.create(&rt, lion(&rt)).unwrap();
		let result = scope.commit();

		assert!(matches!(result, Err(FixtureError::Store(_))));
		assert!(!store.inner.in_transaction());
		assert_eq!(store.inner.count(rt.id()), 0);
	}
}
