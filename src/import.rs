//! Best-effort SQL script importer.
//!
//! Decodes a script with a fixed fallback list of encodings, turns `GO` batch
//! separators into semicolons, and executes every statement independently.
//! Failures are collected into an [`ImportReport`] instead of aborting.

use crate::db::DatabaseClient;
use crate::error::{ExplorerError, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Text encodings tried when decoding a script, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScriptEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "utf-16")]
    Utf16,
    #[serde(rename = "latin-1")]
    Latin1,
}

impl ScriptEncoding {
    /// The order in which encodings are attempted.
    pub const FALLBACK_ORDER: [ScriptEncoding; 3] =
        [ScriptEncoding::Utf8, ScriptEncoding::Utf16, ScriptEncoding::Latin1];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptEncoding::Utf8 => "utf-8",
            ScriptEncoding::Utf16 => "utf-16",
            ScriptEncoding::Latin1 => "latin-1",
        }
    }

    /// Decodes `bytes`, returning `None` if they are not valid in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            ScriptEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_string)
            }
            ScriptEncoding::Utf16 => decode_utf16(bytes),
            ScriptEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl fmt::Display for ScriptEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UTF-16 is only accepted with a byte-order mark; without one almost any
/// even-length byte string would decode.
fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let (body, little_endian) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (rest, true),
        [0xFE, 0xFF, rest @ ..] => (rest, false),
        _ => return None,
    };

    if body.len() % 2 != 0 {
        return None;
    }

    let units = body.chunks_exact(2).map(|pair| {
        if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        }
    });

    char::decode_utf16(units).collect::<std::result::Result<String, _>>().ok()
}

/// Decodes script bytes with the first encoding that accepts them.
///
/// Latin-1 maps every byte, so this never fails.
pub fn decode_script(bytes: &[u8]) -> (String, ScriptEncoding) {
    for encoding in ScriptEncoding::FALLBACK_ORDER {
        if let Some(text) = encoding.decode(bytes) {
            return (text, encoding);
        }
        debug!(encoding = %encoding, "Script is not valid in encoding, trying next");
    }
    // Unreachable in practice: Latin-1 decodes any input.
    (ScriptEncoding::Latin1.decode(bytes).unwrap_or_default(), ScriptEncoding::Latin1)
}

fn go_separator() -> &'static Regex {
    static GO: OnceLock<Regex> = OnceLock::new();
    GO.get_or_init(|| Regex::new(r"(?mi)^[ \t]*GO[ \t]*\r?$").expect("GO pattern is valid"))
}

/// Replaces lines consisting solely of `GO` (any case) with `;`.
pub fn normalize_separators(script: &str) -> String {
    go_separator().replace_all(script, ";").into_owned()
}

/// Splits normalized script text on `;`, dropping blank fragments.
///
/// Semicolons inside string literals or trigger bodies are not special-cased.
pub fn split_statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Outcome of one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatementStatus {
    Succeeded { rows_affected: u64 },
    Failed { reason: String },
}

/// One executed statement and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementOutcome {
    /// 1-based position of the statement in the script.
    pub index: usize,
    pub sql: String,
    #[serde(flatten)]
    pub status: StatementStatus,
}

impl StatementOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, StatementStatus::Succeeded { .. })
    }
}

/// Aggregate status derived from the statement outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// The script contained no statements.
    Empty,
    /// Every statement succeeded.
    Complete,
    /// Some statements succeeded and some failed.
    Partial,
    /// Every statement failed.
    Failed,
}

impl ImportStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, ImportStatus::Failed)
    }
}

/// Result of importing a script.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub encoding: ScriptEncoding,
    pub outcomes: Vec<StatementOutcome>,
}

impl ImportReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StatementOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn status(&self) -> ImportStatus {
        match (self.succeeded(), self.failed()) {
            (0, 0) => ImportStatus::Empty,
            (_, 0) => ImportStatus::Complete,
            (0, _) => ImportStatus::Failed,
            _ => ImportStatus::Partial,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// One-line summary for the shell.
    pub fn summary(&self) -> String {
        match self.status() {
            ImportStatus::Empty => "Script contained no statements.".to_string(),
            ImportStatus::Complete => format!(
                "Imported {} statement(s) ({}).",
                self.outcomes.len(),
                self.encoding
            ),
            ImportStatus::Partial | ImportStatus::Failed => format!(
                "Imported {} of {} statement(s) ({}); {} failed.",
                self.succeeded(),
                self.outcomes.len(),
                self.encoding,
                self.failed()
            ),
        }
    }
}

/// Imports script bytes into `db`, statement by statement.
///
/// There is no enclosing transaction: statements that succeed stay applied
/// even when later ones fail.
pub async fn import_script(db: &dyn DatabaseClient, bytes: &[u8]) -> ImportReport {
    let (text, encoding) = decode_script(bytes);
    let statements = split_statements(&normalize_separators(&text));
    info!(
        encoding = %encoding,
        statements = statements.len(),
        target = db.location(),
        "Importing SQL script"
    );

    let mut outcomes = Vec::with_capacity(statements.len());
    for (i, sql) in statements.into_iter().enumerate() {
        let index = i + 1;
        let status = match db.execute_statement(&sql).await {
            Ok(rows_affected) => StatementStatus::Succeeded { rows_affected },
            Err(e) => {
                let reason = match e {
                    ExplorerError::Query(msg) | ExplorerError::Connection(msg) => msg,
                    other => other.to_string(),
                };
                warn!(index, %reason, "Script statement failed, continuing");
                StatementStatus::Failed { reason }
            }
        };
        outcomes.push(StatementOutcome { index, sql, status });
    }

    let report = ImportReport { encoding, outcomes };
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Script import finished"
    );
    report
}

/// Reads a script file and imports it into `db`.
pub async fn import_file(db: &dyn DatabaseClient, path: &Path) -> Result<ImportReport> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ExplorerError::import(format!("Cannot read {}: {e}", path.display())))?;
    Ok(import_script(db, &bytes).await)
}
