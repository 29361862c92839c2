//! Result presentation: text tables and JSON.

mod table;

pub use table::ResultTable;

use base64::{engine::general_purpose::STANDARD, Engine};
use clap::ValueEnum;
use serde::Serialize;
use serde_json::json;

use crate::db::{QueryResult, Value};
use crate::error::{ExplorerError, Result};
use crate::import::{ImportReport, StatementStatus};
use crate::session::TranscriptEntry;

/// Output format for results printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Box-drawn tables and plain messages.
    #[default]
    Text,
    /// One JSON document per result.
    Json,
}

/// Converts a value to JSON; blobs become base64 strings.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => json!(i),
        Value::Real(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => json!(s),
        Value::Blob(b) => json!(STANDARD.encode(b)),
    }
}

#[derive(Serialize)]
struct JsonResult<'a> {
    columns: Vec<&'a str>,
    rows: Vec<Vec<serde_json::Value>>,
    row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_rows: Option<usize>,
    truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows_affected: Option<u64>,
    execution_ms: u128,
}

/// Renders a query result in the given format.
pub fn render_result(result: &QueryResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(ResultTable::new(result).render()),
        OutputFormat::Json => {
            let doc = JsonResult {
                columns: result.column_names(),
                rows: result
                    .rows
                    .iter()
                    .map(|row| row.iter().map(value_to_json).collect())
                    .collect(),
                row_count: result.row_count,
                total_rows: result.total_rows,
                truncated: result.was_truncated,
                rows_affected: result.rows_affected,
                execution_ms: result.execution_time.as_millis(),
            };
            to_json(&doc)
        }
    }
}

/// Renders an import report: a summary plus one line per failed statement.
pub fn render_import_report(report: &ImportReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(&json!({
            "status": report.status(),
            "encoding": report.encoding,
            "outcomes": report.outcomes,
        })),
        OutputFormat::Text => {
            let mut lines = vec![report.summary()];
            for failure in report.failures() {
                if let StatementStatus::Failed { reason } = &failure.status {
                    lines.push(format!(
                        "  statement {}: {} ({})",
                        failure.index,
                        reason,
                        preview(&failure.sql, 60)
                    ));
                }
            }
            Ok(lines.join("\n"))
        }
    }
}

/// Renders transcript entries in turn order.
pub fn render_transcript(entries: &[TranscriptEntry], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(&entries),
        OutputFormat::Text if entries.is_empty() => Ok("No chat messages yet.".to_string()),
        OutputFormat::Text => Ok(entries
            .iter()
            .map(render_entry)
            .collect::<Vec<_>>()
            .join("\n\n")),
    }
}

/// Renders a single chat entry as `role: content`.
pub fn render_entry(entry: &TranscriptEntry) -> String {
    format!("{}: {}", entry.role, entry.content)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ExplorerError::internal(format!("JSON encoding failed: {e}")))
}

/// First line of `sql`, shortened to `max` characters.
fn preview(sql: &str, max: usize) -> String {
    let first_line = sql.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() > max || sql.lines().nth(1).is_some() {
        let kept: String = first_line.chars().take(max).collect();
        format!("{kept}...")
    } else {
        first_line.to_string()
    }
}
