//! Database abstraction layer for SQL Explorer.
//!
//! Provides a trait-based interface for database operations so the session,
//! importer and chat chain do not depend on the concrete driver.

mod schema;
mod sqlite;
mod types;

pub use schema::{Column, ForeignKey, Schema, Table, TableKind};
pub use sqlite::{SqliteClient, DEFAULT_MAX_ROWS};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the interface for database clients.
///
/// All database operations are async and return Results with ExplorerError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Returns a display string for the database (file path or `:memory:`).
    fn location(&self) -> &str;

    /// Introspects the database schema, returning table and relationship information.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL query and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Executes a statement whose rows are not needed, returning rows affected.
    async fn execute_statement(&self, sql: &str) -> Result<u64>;

    /// Closes the database connection. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;
}
