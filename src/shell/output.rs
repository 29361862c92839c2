//! Transport-agnostic command output.
//!
//! Handlers return a [`CommandOutput`]; the shell renders it to text or JSON.

use crate::db::QueryResult;
use crate::error::Result;
use crate::import::ImportReport;
use crate::present::{
    render_entry, render_import_report, render_result, render_transcript, OutputFormat,
};
use crate::session::TranscriptEntry;

/// Output from a command handler.
#[derive(Debug, Clone)]
pub enum CommandOutput {
    /// Informational message.
    Info(String),
    /// Something was not done; not an error.
    Warning(String),
    Error(String),
    /// A query result.
    Result(QueryResult),
    /// The outcome of a script import.
    Import(ImportReport),
    /// One chat message.
    Chat(TranscriptEntry),
    /// An assistant message reporting that the agent failed.
    ChatFailed(TranscriptEntry),
    /// The whole chat transcript.
    Transcript(Vec<TranscriptEntry>),
    /// Leave the shell.
    Exit,
    /// Several outputs, printed in order.
    Multiple(Vec<CommandOutput>),
}

impl CommandOutput {
    pub fn info(msg: impl Into<String>) -> Self {
        Self::Info(msg.into())
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self::Warning(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit)
    }

    pub fn is_error(&self) -> bool {
        match self {
            Self::Error(_) => true,
            Self::Multiple(outputs) => outputs.iter().any(CommandOutput::is_error),
            _ => false,
        }
    }

    /// True when the command did not succeed. Unlike [`is_error`], this
    /// includes failed chat turns, which still print as chat messages.
    ///
    /// [`is_error`]: CommandOutput::is_error
    pub fn is_failure(&self) -> bool {
        match self {
            Self::Error(_) | Self::ChatFailed(_) => true,
            Self::Multiple(outputs) => outputs.iter().any(CommandOutput::is_failure),
            _ => false,
        }
    }

    /// Renders the output; `None` when there is nothing to print.
    pub fn render(&self, format: OutputFormat) -> Result<Option<String>> {
        let text = match self {
            Self::Info(msg) => msg.clone(),
            Self::Warning(msg) => format!("Warning: {msg}"),
            Self::Error(msg) => msg.clone(),
            Self::Result(result) => render_result(result, format)?,
            Self::Import(report) => render_import_report(report, format)?,
            Self::Chat(entry) | Self::ChatFailed(entry) => match format {
                OutputFormat::Text => render_entry(entry),
                OutputFormat::Json => render_transcript(std::slice::from_ref(entry), format)?,
            },
            Self::Transcript(entries) => render_transcript(entries, format)?,
            Self::Exit => return Ok(None),
            Self::Multiple(outputs) => {
                let mut parts = Vec::with_capacity(outputs.len());
                for output in outputs {
                    if let Some(text) = output.render(format)? {
                        parts.push(text);
                    }
                }
                if parts.is_empty() {
                    return Ok(None);
                }
                parts.join("\n")
            }
        };
        Ok(Some(text))
    }
}
