//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient` trait
//! for SQLite files and in-memory databases using sqlx.

use crate::db::{Column, ColumnInfo, DatabaseClient, ForeignKey, QueryResult, Row, Schema, Table, TableKind, Value};
use crate::error::{ExplorerError, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, Statement, TypeInfo, ValueRef};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default maximum rows to materialize from a query.
pub const DEFAULT_MAX_ROWS: usize = 10_000;

/// How long to wait for the single pooled connection.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// SQLite database client.
///
/// The pool holds exactly one connection so that in-memory databases keep
/// their contents for the lifetime of the client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
    location: String,
    max_rows: usize,
}

impl SqliteClient {
    /// Opens an existing database file.
    ///
    /// Fails with a connection error if the file does not exist or is not an
    /// SQLite database.
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ExplorerError::connection(format!(
                "Database file not found: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false);
        Self::connect_with(options, path.display().to_string()).await
    }

    /// Opens a database file, creating it if it does not exist.
    pub async fn create(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect_with(options, path.display().to_string()).await
    }

    /// Opens a private in-memory database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = "sqlite::memory:"
            .parse::<SqliteConnectOptions>()
            .map_err(|e| ExplorerError::connection(e.to_string()))?;
        Self::connect_with(options, ":memory:".to_string()).await
    }

    /// Sets the maximum number of rows materialized per query.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }

    async fn connect_with(options: SqliteConnectOptions, location: String) -> Result<Self> {
        debug!(%location, "Opening SQLite database");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect_with(options)
            .await
            .map_err(|e| {
                ExplorerError::connection(format!("Cannot open {location}: {}", format_sqlx_error(&e)))
            })?;

        // SQLite opens lazily; touch the schema so garbage files fail here.
        sqlx::query("SELECT count(*) FROM sqlite_master")
            .fetch_one(&pool)
            .await
            .map_err(|e| {
                ExplorerError::connection(format!(
                    "{location} is not a usable SQLite database: {}",
                    format_sqlx_error(&e)
                ))
            })?;

        Ok(Self {
            pool,
            location,
            max_rows: DEFAULT_MAX_ROWS,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.pool.is_closed() {
            return Err(ExplorerError::connection(format!(
                "Connection to {} is closed",
                self.location
            )));
        }
        Ok(())
    }

    async fn fetch_tables(&self) -> Result<Vec<Table>> {
        let entries: Vec<(String, String)> = sqlx::query_as(
            "SELECT name, type FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ExplorerError::query(format_sqlx_error(&e)))?;

        let mut tables = Vec::with_capacity(entries.len());
        for (name, kind) in entries {
            let columns: Vec<(String, String, i64, Option<String>, i64)> = sqlx::query_as(
                "SELECT name, type, \"notnull\", dflt_value, pk \
                 FROM pragma_table_info(?1) ORDER BY cid",
            )
            .bind(&name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ExplorerError::query(format_sqlx_error(&e)))?;

            let mut pk: Vec<(i64, String)> = columns
                .iter()
                .filter(|(_, _, _, _, pk)| *pk > 0)
                .map(|(col, _, _, _, pk)| (*pk, col.clone()))
                .collect();
            pk.sort();

            tables.push(Table {
                name,
                kind: if kind == "view" {
                    TableKind::View
                } else {
                    TableKind::Table
                },
                columns: columns
                    .into_iter()
                    .map(|(col, data_type, notnull, default, _)| {
                        let column = Column::new(col, data_type).nullable(notnull == 0);
                        match default {
                            Some(d) => column.with_default(d),
                            None => column,
                        }
                    })
                    .collect(),
                primary_key: pk.into_iter().map(|(_, col)| col).collect(),
            });
        }

        Ok(tables)
    }

    async fn fetch_foreign_keys(&self, tables: &[Table]) -> Result<Vec<ForeignKey>> {
        let mut foreign_keys = Vec::new();

        for table in tables.iter().filter(|t| t.kind == TableKind::Table) {
            let refs: Vec<(String, String, Option<String>)> = sqlx::query_as(
                "SELECT \"table\", \"from\", \"to\" \
                 FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
            )
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ExplorerError::query(format_sqlx_error(&e)))?;

            for (to_table, from_column, to_column) in refs {
                // A NULL target column refers to the parent's primary key.
                let to_column = to_column.unwrap_or_else(|| {
                    tables
                        .iter()
                        .find(|t| t.name.eq_ignore_ascii_case(&to_table))
                        .and_then(|t| t.primary_key.first().cloned())
                        .unwrap_or_default()
                });
                foreign_keys.push(ForeignKey::new(
                    table.name.clone(),
                    from_column,
                    to_table,
                    to_column,
                ));
            }
        }

        Ok(foreign_keys)
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn location(&self) -> &str {
        &self.location
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        self.ensure_open()?;
        let tables = self.fetch_tables().await?;
        let foreign_keys = self.fetch_foreign_keys(&tables).await?;

        Ok(Schema {
            tables,
            foreign_keys,
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.ensure_open()?;
        let start = Instant::now();

        let statement = (&self.pool)
            .prepare(sql)
            .await
            .map_err(|e| ExplorerError::query(format_sqlx_error(&e)))?;

        let mut columns: Vec<ColumnInfo> = statement
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect();

        if columns.is_empty() {
            let done = sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| ExplorerError::query(format_sqlx_error(&e)))?;
            return Ok(QueryResult::affected(done.rows_affected())
                .with_execution_time(start.elapsed()));
        }

        let mut stream = sqlx::query(sql).fetch(&self.pool);
        let mut rows: Vec<Row> = Vec::new();
        let mut total_rows = 0usize;

        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| ExplorerError::query(format_sqlx_error(&e)))?
        {
            if total_rows == 0 {
                refine_column_types(&mut columns, &row);
            }
            total_rows += 1;
            if rows.len() < self.max_rows {
                rows.push(convert_row(&row));
            }
        }

        let execution_time = start.elapsed();
        let was_truncated = total_rows > rows.len();
        if was_truncated {
            warn!(
                total_rows,
                max_rows = self.max_rows,
                "Query result truncated"
            );
        }

        let row_count = rows.len();
        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            total_rows: Some(total_rows),
            was_truncated,
            rows_affected: None,
        })
    }

    async fn execute_statement(&self, sql: &str) -> Result<u64> {
        self.ensure_open()?;
        let done = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| ExplorerError::query(format_sqlx_error(&e)))?;
        Ok(done.rows_affected())
    }

    async fn close(&self) -> Result<()> {
        if !self.pool.is_closed() {
            debug!(location = %self.location, "Closing SQLite database");
            self.pool.close().await;
        }
        Ok(())
    }
}

/// Replaces untyped column metadata (expressions report `NULL`) with the
/// storage class of the first row's values.
fn refine_column_types(columns: &mut [ColumnInfo], row: &SqliteRow) {
    for (index, column) in columns.iter_mut().enumerate() {
        if !column.data_type.eq_ignore_ascii_case("null") && !column.data_type.is_empty() {
            continue;
        }
        if let Ok(raw) = row.try_get_raw(index) {
            if !raw.is_null() {
                column.data_type = raw.type_info().name().to_string();
            }
        }
    }
}

/// Converts an SQLite row into our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a single value using its runtime storage class.
///
/// SQLite is dynamically typed, so the declared column type is only a hint.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return Value::Null,
    };

    let value = match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get_unchecked::<i64, _>(index).map(Value::Integer),
        "REAL" | "NUMERIC" => row.try_get_unchecked::<f64, _>(index).map(Value::Real),
        "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(index).map(Value::Blob),
        _ => row.try_get_unchecked::<String, _>(index).map(Value::Text),
    };

    value.unwrap_or(Value::Null)
}

/// Formats a sqlx error for user display.
fn format_sqlx_error(error: &sqlx::Error) -> String {
    match error {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        sqlx::Error::PoolClosed => "connection is closed".to_string(),
        sqlx::Error::PoolTimedOut => "timed out waiting for the database connection".to_string(),
        other => other.to_string(),
    }
}
