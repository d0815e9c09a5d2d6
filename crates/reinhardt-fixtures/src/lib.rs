//! Dependency-ordered fixture serialization and loading for the Reinhardt
//! framework.
//!
//! This crate provides Django-compatible fixtures:
//!
//! - **Dependency resolution**: order models so natural-key dependencies are
//!   written first, and report cycles precisely
//! - **Fixture codec**: dump stored records with surrogate ids or natural
//!   keys, and load them back with typed coercion and natural-key lookup
//! - **Commands**: `loaddata` and `dumpdata`
//!
//! # Features
//!
//! - `json` - JSON fixture format support (enabled by default)
//! - `yaml` - YAML fixture format support
//! - `full` - All features enabled
//!
//! # Quick Start
//!
//! Describe the models and register them:
//!
//! ```
//! use reinhardt_fixtures::prelude::*;
//!
//! let registry = TypeRegistry::new();
//! registry.register(
//!     RecordType::builder("shop", "Store")
//!         .field("name", FieldKind::String)
//!         .natural_key(["name"])
//!         .build()
//!         .unwrap(),
//! );
//! registry.register(
//!     RecordType::builder("shop", "Book")
//!         .field("name", FieldKind::String)
//!         .many_to_many("stores", "shop.Store")
//!         .build()
//!         .unwrap(),
//! );
//!
//! // Load a fixture referencing stores by natural key
//! let store = MemoryStore::new();
//! let fixture = r#"[
//!     {"model": "shop.store", "fields": {"name": "Amazon"}},
//!     {"model": "shop.book", "fields": {"name": "Cryptonomicon", "stores": [["Amazon"]]}}
//! ]"#;
//! let result = FixtureLoader::new(&registry, &store)
//!     .load_str("books", fixture, "json")
//!     .unwrap();
//! assert_eq!(result.records_loaded, 2);
//!
//! // Dump it back with natural keys
//! let mut out = Vec::new();
//! DumpDataCommand::new(&registry, &store)
//!     .execute(
//!         DumpDataArgs::new(["shop"]),
//!         DumpDataOptions::new().with_natural_keys(true),
//!         &mut out,
//!     )
//!     .unwrap();
//! assert!(String::from_utf8(out).unwrap().contains(r#""stores":[["Amazon"]]"#));
//! ```
//!
//! # Architecture
//!
//! - [`RecordType`](model::RecordType) - Static model description: fields,
//!   natural key, explicit dependencies
//! - [`sort_dependencies`](resolver::sort_dependencies) - Natural-key
//!   dependency ordering
//! - [`RecordStore`](store::RecordStore) - Storage collaborator, with
//!   [`TransactionScope`](store::TransactionScope) per loaded source
//! - [`FixtureSerializer`](fixtures::FixtureSerializer) and
//!   [`Deserializer`](fixtures::Deserializer) - The record codec
//! - [`FixtureLoader`](fixtures::FixtureLoader) - Fixture discovery and
//!   installation
//! - [`LoadDataCommand`](commands::LoadDataCommand) and
//!   [`DumpDataCommand`](commands::DumpDataCommand) - Management commands

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod commands;
pub mod error;
pub mod fixtures;
pub mod model;
pub mod prelude;
pub mod resolver;
pub mod settings;
pub mod store;

// Re-export commonly used types at crate root
pub use error::{FixtureError, FixtureResult, RecordLocation};
pub use fixtures::{FixtureData, FixtureLoader, FixtureParser, FixtureRecord, FixtureSerializer};
pub use model::{RecordType, TypeRegistry};
pub use resolver::sort_dependencies;
