//! CSV export of query results.

use crate::db::QueryResult;
use crate::error::{ExplorerError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default file name for exported results.
pub const EXPORT_FILE_NAME: &str = "query_results.csv";

/// Renders a result as CSV: a header row followed by one record per row.
pub fn to_csv(result: &QueryResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(result.columns.iter().map(|c| c.name.as_str()))
        .map_err(|e| ExplorerError::internal(format!("CSV encoding failed: {e}")))?;

    for row in &result.rows {
        writer
            .write_record(row.iter().map(|v| v.to_csv_field()))
            .map_err(|e| ExplorerError::internal(format!("CSV encoding failed: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExplorerError::internal(format!("CSV encoding failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ExplorerError::internal(e.to_string()))
}

/// Writes a result as CSV to `path`.
pub async fn write_csv(result: &QueryResult, path: &Path) -> Result<PathBuf> {
    let content = to_csv(result)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    info!(path = %path.display(), rows = result.rows.len(), "Exported result to CSV");
    Ok(path.to_path_buf())
}
