//! Django-like management commands.
//!
//! - [`LoadDataCommand`]: install fixtures
//! - [`DumpDataCommand`]: export records as fixtures

mod dumpdata;
mod loaddata;

pub use dumpdata::{DumpDataArgs, DumpDataCommand, DumpDataOptions, DumpResult};
pub use loaddata::{LoadDataArgs, LoadDataCommand, LoadDataOptions};
