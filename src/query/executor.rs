//! Query execution with input validation and optional safety gating.
//!
//! Provides isolated query execution that can be tested independently of the
//! session and the chat chain.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::{ExplorerError, Result};
use crate::safety::{classify_sql, ClassificationResult};

/// Warning shown instead of executing blank input.
pub const EMPTY_QUERY_WARNING: &str = "Please enter a valid SQL query.";

/// Runs SQL against a borrowed database connection.
pub struct QueryExecutor<'a> {
    db: &'a dyn DatabaseClient,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(db: &'a dyn DatabaseClient) -> Self {
        Self { db }
    }

    /// Runs user-entered SQL.
    ///
    /// Blank input is not sent to the database and yields
    /// [`RunOutcome::Warning`].
    pub async fn run(&self, sql: &str) -> Result<RunOutcome> {
        let sql = sql.trim();
        if sql.is_empty() {
            debug!("Ignoring empty query");
            return Ok(RunOutcome::Warning(EMPTY_QUERY_WARNING.to_string()));
        }
        self.execute_immediate(sql).await.map(RunOutcome::Completed)
    }

    /// Classifies SQL and executes it only if it is read-only or writes are
    /// allowed.
    pub async fn run_guarded(&self, sql: &str, allow_writes: bool) -> ExecutionResult {
        let classification = classify_sql(sql);

        if classification.is_write() && !allow_writes {
            info!(
                level = %classification.level,
                statement = %classification.statement_type,
                "Refusing to run generated SQL that modifies the database"
            );
            return ExecutionResult::Refused {
                sql: sql.to_string(),
                classification,
            };
        }

        match self.execute_immediate(sql).await {
            Ok(outcome) => ExecutionResult::Success(outcome),
            Err(e) => ExecutionResult::Error(e),
        }
    }

    async fn execute_immediate(&self, sql: &str) -> Result<QueryOutcome> {
        let start = Instant::now();
        let result = self.db.execute_query(sql).await;
        let execution_time = start.elapsed();

        match result {
            Ok(result) => {
                info!(
                    rows = result.row_count,
                    rows_affected = result.rows_affected,
                    elapsed_ms = execution_time.as_millis() as u64,
                    "Query executed"
                );
                Ok(QueryOutcome {
                    sql: sql.to_string(),
                    result,
                    execution_time,
                })
            }
            Err(e @ (ExplorerError::Connection(_) | ExplorerError::Query(_))) => {
                debug!(error = %e, "Query failed");
                Err(e)
            }
            Err(e) => Err(ExplorerError::query(e.to_string())),
        }
    }
}

/// Result of running user-entered SQL.
#[derive(Debug)]
pub enum RunOutcome {
    /// The input was not executed.
    Warning(String),
    /// The query ran.
    Completed(QueryOutcome),
}

/// Result of running generated SQL through the safety gate.
#[derive(Debug)]
pub enum ExecutionResult {
    Success(QueryOutcome),
    /// The SQL would modify the database and writes are not allowed.
    Refused {
        sql: String,
        classification: ClassificationResult,
    },
    Error(ExplorerError),
}

/// Successful query execution outcome.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub sql: String,
    pub result: QueryResult,
    pub execution_time: Duration,
}
