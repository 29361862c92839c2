//! Query execution for SQL Explorer.
//!
//! Isolates running SQL, blank-input handling and safety gating from the
//! session and the chat chain.

pub mod executor;

pub use executor::{ExecutionResult, QueryExecutor, QueryOutcome, RunOutcome, EMPTY_QUERY_WARNING};
