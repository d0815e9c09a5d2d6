//! Record types of the `fixtures_regress` test application.

use reinhardt_fixtures::model::{FieldKind, RecordType, TypeRegistry};
use std::sync::Arc;

/// App label every regression model lives in.
pub const APP: &str = "fixtures_regress";

/// Builds a registry holding every regression model plus `auth.User`.
pub fn regress_registry() -> TypeRegistry {
	let registry = TypeRegistry::new();
	for record_type in regress_models() {
		registry.register(record_type);
	}
	registry
}

/// Looks up a regression model by name.
pub fn model(registry: &TypeRegistry, name: &str) -> Arc<RecordType> {
	registry
		.resolve(&format!("{}.{}", APP, name))
		.unwrap_or_else(|e| panic!("{} is not registered: {}", name, e))
}

/// Looks up several regression models by name, keeping the given order.
pub fn models(registry: &TypeRegistry, names: &[&str]) -> Vec<Arc<RecordType>> {
	names.iter().map(|name| model(registry, name)).collect()
}

fn builder(name: &str) -> reinhardt_fixtures::model::RecordTypeBuilder {
	RecordType::builder(APP, name)
}

fn circle(name: &str, depends_on: &str) -> RecordType {
	builder(name)
		.field("name", FieldKind::String)
		.natural_key(["name"])
		.natural_key_dependencies([format!("{}.{}", APP, depends_on)])
		.build()
		.unwrap()
}

fn regress_models() -> Vec<RecordType> {
	vec![
		RecordType::builder("auth", "User")
			.field("username", FieldKind::String)
			.natural_key(["username"])
			.build()
			.unwrap(),
		builder("Animal")
			.field("name", FieldKind::String)
			.field("latin_name", FieldKind::String)
			.field("count", FieldKind::Integer)
			.field("weight", FieldKind::Float)
			.build()
			.unwrap(),
		builder("Plant")
			.field("name", FieldKind::String)
			.build()
			.unwrap(),
		builder("Stuff")
			.nullable_field("name", FieldKind::String)
			.nullable_foreign_key("owner", "auth.User")
			.build()
			.unwrap(),
		builder("Absolute")
			.field("name", FieldKind::String)
			.build()
			.unwrap(),
		builder("Widget")
			.field("name", FieldKind::String)
			.ordering(["name"])
			.build()
			.unwrap(),
		builder("WidgetProxy")
			.field("name", FieldKind::String)
			.storage_alias_of("fixtures_regress.Widget")
			.ordering(["name"])
			.build()
			.unwrap(),
		builder("Store")
			.field("name", FieldKind::String)
			.natural_key(["name"])
			.ordering(["name"])
			.build()
			.unwrap(),
		// Person declares a store dependency without holding a relation to it.
		builder("Person")
			.field("name", FieldKind::String)
			.natural_key(["name"])
			.natural_key_dependencies(["fixtures_regress.store"])
			.ordering(["name"])
			.build()
			.unwrap(),
		builder("Book")
			.field("name", FieldKind::String)
			.foreign_key("author", "fixtures_regress.Person")
			.many_to_many("stores", "fixtures_regress.Store")
			.ordering(["name"])
			.build()
			.unwrap(),
		builder("NKChild")
			.field("name", FieldKind::String)
			.field("data", FieldKind::String)
			.natural_key(["data"])
			.build()
			.unwrap(),
		builder("RefToNKChild")
			.field("text", FieldKind::String)
			.foreign_key("nk_fk", "fixtures_regress.NKChild")
			.many_to_many("nk_m2m", "fixtures_regress.NKChild")
			.build()
			.unwrap(),
		circle("Circle1", "circle2"),
		circle("Circle2", "circle1"),
		circle("Circle3", "circle3"),
		circle("Circle4", "circle5"),
		circle("Circle5", "circle6"),
		circle("Circle6", "circle4"),
		circle("ExternalDependency", "book"),
		builder("Tagger")
			.field("name", FieldKind::String)
			.many_to_many_through("topics", "fixtures_regress.Tag", "fixtures_regress.TaggerTag")
			.natural_key(["name"])
			.build()
			.unwrap(),
		builder("Posting")
			.foreign_key("tagger", "fixtures_regress.Tagger")
			.field("text", FieldKind::String)
			.field("time", FieldKind::DateTime)
			.natural_key(["tagger", "time"])
			.natural_key_dependencies(["fixtures_regress.tagger"])
			.build()
			.unwrap(),
		builder("Tag")
			.field("name", FieldKind::String)
			.many_to_many_through(
				"postings",
				"fixtures_regress.Posting",
				"fixtures_regress.PostingTag",
			)
			.natural_key(["name"])
			.build()
			.unwrap(),
		builder("PostingTag")
			.foreign_key("tag", "fixtures_regress.Tag")
			.foreign_key("posting", "fixtures_regress.Posting")
			.natural_key(["tag", "posting"])
			.build()
			.unwrap(),
		builder("TaggerTag")
			.foreign_key("tagger", "fixtures_regress.Tagger")
			.foreign_key("tag", "fixtures_regress.Tag")
			.natural_key(["tag", "tagger"])
			.build()
			.unwrap(),
	]
}
