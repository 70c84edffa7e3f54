//! Test helpers module
//!
//! This module provides utilities and helpers for testing the GoLoop service.
//! It includes test data builders, an in-memory test context wired behind the
//! real router, and PostgreSQL setup for store tests.

#![allow(dead_code)]

pub mod database_helper;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use test_context::*;
pub use test_data::*;
