//! Convenience re-exports for common usage.
//!
//! This module provides a single import for the most commonly used items
//! from the reinhardt-fixtures crate.
//!
//! # Example
//!
//! ```
//! use reinhardt_fixtures::prelude::*;
//!
//! let registry = TypeRegistry::new();
//! let store = MemoryStore::new();
//! let loader = FixtureLoader::new(&registry, &store);
//! assert!(loader.options().use_transaction);
//! ```

// Error types
pub use crate::error::{FixtureError, FixtureResult, RecordLocation};

// Model metadata
pub use crate::model::{
	FieldKind, FieldValue, ModelId, NaturalKeyValue, Record, RecordType, SurrogateId,
	TypeRegistry, register_record_type,
};

// Dependency resolution
pub use crate::resolver::sort_dependencies;

// Storage
pub use crate::store::{MemoryStore, RecordStore, TransactionScope};

// Fixture types
pub use crate::fixtures::{
	Deserializer, FixtureData, FixtureLoader, FixtureParser, FixtureRecord, FixtureSerializer,
	FormatRegistry, JsonFormat, LoadOptions, LoadResult, SerializationFormat, SerializeOptions,
};

// Settings
pub use crate::settings::FixtureSettings;

// Command types
pub use crate::commands::{
	DumpDataArgs, DumpDataCommand, DumpDataOptions, DumpResult, LoadDataArgs, LoadDataCommand,
	LoadDataOptions,
};
