//! Command handlers: run one parsed command against the session.

use std::path::Path;

use tracing::debug;

use super::help::HELP_TEXT;
use super::output::CommandOutput;
use super::router::Command;
use crate::error::ExplorerError;
use crate::llm::Role;
use crate::query::RunOutcome;
use crate::session::{ChatReply, Session, TranscriptEntry, UploadOutcome};
use crate::upload::UploadedArtifact;

/// Runs `command` and describes what happened. Errors become
/// [`CommandOutput::Error`]; nothing here ends the session.
pub async fn dispatch(session: &mut Session, command: Command) -> CommandOutput {
    debug!(?command, "Dispatching command");
    match command {
        Command::Open(path) => handle_open(session, Path::new(&path)).await,
        Command::Import(path) => match session.import_script(Path::new(&path)).await {
            Ok(report) => CommandOutput::Import(report),
            Err(e) => error_output(e),
        },
        Command::Sql(sql) => handle_sql(session, &sql).await,
        Command::Export(path) => handle_export(session, path.as_deref().map(Path::new)).await,
        Command::Schema => match session.schema().await {
            Ok(schema) => CommandOutput::Info(schema.format_for_display()),
            Err(e) => error_output(e),
        },
        Command::History => CommandOutput::Transcript(session.transcript().entries().to_vec()),
        Command::Help => CommandOutput::info(HELP_TEXT),
        Command::Quit => CommandOutput::Exit,
        Command::Chat(prompt) if prompt.is_empty() => CommandOutput::Multiple(vec![]),
        Command::Chat(prompt) => handle_chat(session, &prompt).await,
        Command::Usage(usage) => CommandOutput::error(format!("Usage: {usage}")),
        Command::Unknown(name) => CommandOutput::error(format!(
            "Unknown command: {name}. Type /help for available commands."
        )),
    }
}

fn error_output(e: ExplorerError) -> CommandOutput {
    CommandOutput::error(e.to_string())
}

async fn handle_open(session: &mut Session, path: &Path) -> CommandOutput {
    let artifact = match UploadedArtifact::from_path(path).await {
        Ok(artifact) => artifact,
        Err(e) => return error_output(e),
    };

    match session.upload(artifact).await {
        Ok(UploadOutcome::Opened(path)) => {
            let tables = session
                .schema()
                .await
                .map(|schema| schema.tables.len())
                .unwrap_or_default();
            CommandOutput::info(format!(
                "Opened {} ({tables} table{})",
                path.display(),
                if tables == 1 { "" } else { "s" }
            ))
        }
        Ok(UploadOutcome::Imported(report)) => CommandOutput::Import(report),
        Err(e) => error_output(e),
    }
}

async fn handle_sql(session: &mut Session, sql: &str) -> CommandOutput {
    match session.run_query(sql).await {
        Ok(RunOutcome::Warning(msg)) => CommandOutput::Warning(msg),
        Ok(RunOutcome::Completed(outcome)) => CommandOutput::Result(outcome.result),
        Err(e) => error_output(e),
    }
}

async fn handle_export(session: &mut Session, path: Option<&Path>) -> CommandOutput {
    let rows = session.last_result().map(|r| r.row_count).unwrap_or_default();
    match session.export_csv(path).await {
        Ok(path) => CommandOutput::info(format!(
            "Exported {rows} row(s) to {}",
            path.display()
        )),
        Err(e) => error_output(e),
    }
}

async fn handle_chat(session: &mut Session, prompt: &str) -> CommandOutput {
    match session.ask(prompt).await {
        Ok(ChatReply::Answered(answer)) => {
            let mut outputs = Vec::new();
            if let Some(sql) = answer.sql {
                outputs.push(CommandOutput::info(sql));
            }
            if let Some(result) = answer.result {
                outputs.push(CommandOutput::Result(result));
            }
            outputs.push(CommandOutput::Chat(TranscriptEntry::new(
                Role::Assistant,
                answer.answer,
            )));
            CommandOutput::Multiple(outputs)
        }
        Ok(ChatReply::Failed(e)) => {
            CommandOutput::ChatFailed(TranscriptEntry::new(Role::Assistant, e.to_string()))
        }
        Err(e) => error_output(e),
    }
}
