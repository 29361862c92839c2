//! SQL Explorer - upload a SQLite database or SQL script, query it, export
//! results, and ask questions about the data in plain language.
//!
//! The binary is a thin wrapper; everything is exposed here for integration
//! tests.

pub mod agent;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod llm;
pub mod logging;
pub mod present;
pub mod query;
pub mod safety;
pub mod secrets;
pub mod session;
pub mod shell;
pub mod upload;
