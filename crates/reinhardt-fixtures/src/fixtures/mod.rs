//! Fixture system.
//!
//! - [`format`]: the fixture unit and the pluggable textual formats
//! - [`FixtureParser`]: reads fixture files and strings
//! - [`Deserializer`]: turns fixture units into typed records
//! - [`FixtureLoader`]: finds fixtures on disk and installs them
//! - [`FixtureSerializer`]: reads records back out of a store

mod deserializer;
pub mod format;
mod loader;
mod parser;
mod serializer;

pub use deserializer::Deserializer;
#[cfg(feature = "yaml")]
pub use format::YamlFormat;
pub use format::{FixtureData, FixtureRecord, FormatRegistry, JsonFormat, SerializationFormat};
pub use loader::{FixtureLoader, LoadOptions, LoadResult};
pub use parser::FixtureParser;
pub use serializer::{FixtureSerializer, SerializeOptions};
