//! Integration tests for SQL Explorer.

pub mod cli_test;
pub mod common;
pub mod export_test;
pub mod import_test;
pub mod query_test;
pub mod session_test;
