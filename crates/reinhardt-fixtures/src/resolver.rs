//! Natural-key dependency resolution.
//!
//! Before records are serialized with natural keys, the models they belong to
//! must be ordered so that every model comes after the models its natural key
//! (or its relations to natural-keyed models) depend on. Otherwise a later
//! load would meet a natural-key reference to a row that does not exist yet.
//!
//! # Algorithm
//!
//! The working list is scanned repeatedly in its current order. A model is
//! emitted as soon as each of its dependencies is either outside the working
//! list or already emitted (including earlier in the same scan); the others
//! are kept, in order, for the next scan. A scan that emits nothing means the
//! remaining models cannot be ordered.
//!
//! # Example
//!
//! ```
//! use reinhardt_fixtures::model::{FieldKind, RecordType};
//! use reinhardt_fixtures::resolver::sort_dependencies;
//!
//! let store = RecordType::builder("shop", "Store")
//!     .field("name", FieldKind::String)
//!     .natural_key(["name"])
//!     .build_arc()
//!     .unwrap();
//! let book = RecordType::builder("shop", "Book")
//!     .field("name", FieldKind::String)
//!     .many_to_many("stores", "shop.Store")
//!     .build_arc()
//!     .unwrap();
//!
//! let sorted = sort_dependencies(&[("shop", vec![book.clone(), store.clone()])]).unwrap();
//! assert_eq!(sorted, vec![store, book]);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{FixtureError, FixtureResult};
use crate::model::{ModelId, RecordType};

/// A model waiting to be emitted, with its effective dependency set.
#[derive(Debug)]
struct PendingModel {
	record_type: Arc<RecordType>,
	dependencies: Vec<ModelId>,
}

/// Computes the effective dependency set of `record_type`.
///
/// Explicit natural-key dependencies are kept as declared, a model naming
/// itself included. Relation targets count only when they are key-bearing
/// members of `working` (a plain model never blocks anything).
fn effective_dependencies(record_type: &RecordType, working: &[Arc<RecordType>]) -> Vec<ModelId> {
	let mut dependencies: Vec<ModelId> = record_type
		.natural_key()
		.map(|nk| nk.dependencies.clone())
		.unwrap_or_default();

	for target in record_type.relation_dependencies() {
		let key_bearing = working
			.iter()
			.any(|rt| rt.id() == target && rt.has_natural_key());
		if key_bearing && !dependencies.contains(target) {
			dependencies.push(target.clone());
		}
	}

	dependencies
}

/// Orders models so that natural-key dependencies are serialized first.
///
/// `app_list` is a sequence of `(app_label, models)` groups. Groups are
/// flattened in order; a model listed twice keeps its first position. Ties
/// between unconstrained models are broken by that first-seen order.
///
/// # Errors
///
/// Returns [`FixtureError::CyclicDependency`] naming every key-bearing model
/// left over when no further progress is possible, sorted by qualified name.
/// Plain models (no natural key) are never named.
pub fn sort_dependencies<S: AsRef<str>>(
	app_list: &[(S, Vec<Arc<RecordType>>)],
) -> FixtureResult<Vec<Arc<RecordType>>> {
	let mut working: Vec<Arc<RecordType>> = Vec::new();
	let mut seen = HashSet::new();
	for (app_label, models) in app_list {
		tracing::trace!(app = app_label.as_ref(), count = models.len(), "collecting models");
		for model in models {
			if seen.insert(model.id().key()) {
				working.push(model.clone());
			}
		}
	}

	let members: HashSet<String> = working.iter().map(|rt| rt.id().key()).collect();
	let mut pending: Vec<PendingModel> = working
		.iter()
		.map(|rt| PendingModel {
			record_type: rt.clone(),
			dependencies: effective_dependencies(rt, &working),
		})
		.collect();

	let mut sorted: Vec<Arc<RecordType>> = Vec::with_capacity(pending.len());
	let mut emitted: HashSet<String> = HashSet::new();
	let mut pass = 0usize;

	while !pending.is_empty() {
		pass += 1;
		let mut skipped = Vec::new();
		let mut changed = false;

		for model in pending {
			let ready = model.dependencies.iter().all(|dep| {
				let key = dep.key();
				!members.contains(&key) || emitted.contains(&key)
			});

			if ready {
				emitted.insert(model.record_type.id().key());
				sorted.push(model.record_type);
				changed = true;
			} else {
				skipped.push(model);
			}
		}

		tracing::debug!(pass, emitted = sorted.len(), remaining = skipped.len(), "dependency scan");

		if !changed {
			let mut models: Vec<String> = skipped
				.iter()
				.filter(|m| m.record_type.has_natural_key())
				.map(|m| m.record_type.id().to_string())
				.collect();
			models.sort();
			return Err(FixtureError::CyclicDependency { models });
		}

		pending = skipped;
	}

	Ok(sorted)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::FieldKind;
	use rstest::rstest;

	fn keyed(name: &str, deps: &[&str]) -> Arc<RecordType> {
		RecordType::builder("graph", name)
			.field("name", FieldKind::String)
			.natural_key(["name"])
			.natural_key_dependencies(deps.iter().map(|d| format!("graph.{}", d)))
			.build_arc()
			.unwrap()
	}

	fn names(sorted: &[Arc<RecordType>]) -> Vec<&str> {
		sorted.iter().map(|rt| rt.id().model_name()).collect()
	}

	#[rstest]
	fn test_empty_input() {
		let app_list: Vec<(&str, Vec<Arc<RecordType>>)> = vec![];
		assert!(sort_dependencies(&app_list).unwrap().is_empty());
	}

	#[rstest]
	fn test_chain_across_scans() {
		let a = keyed("A", &["B"]);
		let b = keyed("B", &["C"]);
		let c = keyed("C", &[]);

		let sorted = sort_dependencies(&[("graph", vec![a, b, c])]).unwrap();
		assert_eq!(names(&sorted), vec!["C", "B", "A"]);
	}

	#[rstest]
	fn test_emitted_in_same_scan_satisfies_later_models() {
		let c = keyed("C", &[]);
		let b = keyed("B", &["C"]);
		let a = keyed("A", &["B"]);

		let sorted = sort_dependencies(&[("graph", vec![c, b, a])]).unwrap();
		assert_eq!(names(&sorted), vec!["C", "B", "A"]);
	}

	#[rstest]
	fn test_duplicates_keep_first_position() {
		let a = keyed("A", &[]);
		let b = keyed("B", &[]);

		let sorted =
			sort_dependencies(&[("graph", vec![b.clone(), a.clone()]), ("graph", vec![a, b])])
				.unwrap();
		assert_eq!(names(&sorted), vec!["B", "A"]);
	}

	#[rstest]
	fn test_dependency_outside_working_set_is_satisfied() {
		let a = keyed("A", &["Missing"]);
		let sorted = sort_dependencies(&[("graph", vec![a])]).unwrap();
		assert_eq!(names(&sorted), vec!["A"]);
	}

	#[rstest]
	fn test_self_dependency_is_a_cycle() {
		let a = keyed("A", &["A"]);
		let err = sort_dependencies(&[("graph", vec![a])]).unwrap_err();
		assert_eq!(
			err.to_string(),
			"Can't resolve dependencies for graph.A in serialized app list."
		);
	}

	#[rstest]
	fn test_blocked_dependent_is_reported_with_cycle() {
		let a = keyed("A", &["B"]);
		let b = keyed("B", &["A"]);
		let c = keyed("C", &["A"]);

		match sort_dependencies(&[("graph", vec![c, b, a])]) {
			Err(FixtureError::CyclicDependency { models }) => {
				assert_eq!(models, vec!["graph.A", "graph.B", "graph.C"]);
			}
			other => panic!("Expected CyclicDependency, got {:?}", other),
		}
	}

	#[rstest]
	fn test_plain_model_never_reported() {
		let a = keyed("A", &["A"]);
		let plain = RecordType::builder("graph", "Plain")
			.foreign_key("a", "graph.A")
			.build_arc()
			.unwrap();

		match sort_dependencies(&[("graph", vec![plain, a])]) {
			Err(FixtureError::CyclicDependency { models }) => {
				assert_eq!(models, vec!["graph.A"]);
			}
			other => panic!("Expected CyclicDependency, got {:?}", other),
		}
	}

	#[rstest]
	fn test_self_relation_is_not_a_dependency() {
		let node = RecordType::builder("graph", "Node")
			.field("name", FieldKind::String)
			.nullable_foreign_key("parent", "graph.Node")
			.natural_key(["name"])
			.build_arc()
			.unwrap();

		let sorted = sort_dependencies(&[("graph", vec![node])]).unwrap();
		assert_eq!(names(&sorted), vec!["Node"]);
	}
}
