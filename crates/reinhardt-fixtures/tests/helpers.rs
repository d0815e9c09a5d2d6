//! Test helpers for reinhardt-fixtures integration tests.
//!
//! This module provides the shared record types and a loader for the
//! fixture files under `tests/fixtures/data`.

#![allow(dead_code)]

#[path = "helpers/models.rs"]
pub mod models;
#[path = "helpers/test_data.rs"]
pub mod test_data;
