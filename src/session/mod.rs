//! The per-process session: open database, chat agent, transcript and the
//! most recent query result.
//!
//! Both the interactive shell and one-shot runs drive a [`Session`]; neither
//! holds database or chat state of its own.

mod transcript;

pub use transcript::{Transcript, TranscriptEntry};

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::agent::{AgentAnswer, QueryAgent};
use crate::config::Config;
use crate::db::{DatabaseClient, QueryResult, Schema, SqliteClient};
use crate::error::{ExplorerError, Result};
use crate::export::{write_csv, EXPORT_FILE_NAME};
use crate::import::{self, ImportReport};
use crate::query::{QueryExecutor, RunOutcome, EMPTY_QUERY_WARNING};
use crate::upload::{ArtifactKind, UploadedArtifact, TEMP_DATABASE_NAME};

const NO_DATABASE: &str = "No database open. Upload a database with /open or a script with /import.";

/// What an upload did.
#[derive(Debug)]
pub enum UploadOutcome {
    /// A database file was copied to the workspace and opened.
    Opened(PathBuf),
    /// A script was imported.
    Imported(ImportReport),
}

/// How a chat prompt ended. Either way the transcript gained an answer.
#[derive(Debug)]
pub enum ChatReply {
    Answered(AgentAnswer),
    Failed(ExplorerError),
}

/// State for one user session.
pub struct Session {
    config: Config,
    db: Option<Box<dyn DatabaseClient>>,
    db_path: Option<PathBuf>,
    agent: Option<Box<dyn QueryAgent>>,
    transcript: Transcript,
    last_result: Option<QueryResult>,
}

impl Session {
    /// Creates a session with no database open.
    ///
    /// Without an agent, chat prompts are rejected with a configuration error.
    pub fn new(config: Config, agent: Option<Box<dyn QueryAgent>>) -> Self {
        Self {
            config,
            db: None,
            db_path: None,
            agent,
            transcript: Transcript::new(),
            last_result: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workspace(&self) -> &Path {
        &self.config.session.workspace
    }

    pub fn has_agent(&self) -> bool {
        self.agent.is_some()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn last_result(&self) -> Option<&QueryResult> {
        self.last_result.as_ref()
    }

    /// Path of the open database file.
    pub fn database_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn database(&self) -> Result<&dyn DatabaseClient> {
        self.db
            .as_deref()
            .ok_or_else(|| ExplorerError::connection(NO_DATABASE))
    }

    /// Accepts an uploaded file: databases are copied into the workspace and
    /// opened, scripts are imported.
    pub async fn upload(&mut self, artifact: UploadedArtifact) -> Result<UploadOutcome> {
        match artifact.kind {
            ArtifactKind::Database => {
                let path = artifact.persist(self.workspace()).await?;
                self.open_database(&path).await?;
                Ok(UploadOutcome::Opened(path))
            }
            ArtifactKind::Script => {
                let report = self.import_bytes(&artifact.bytes).await?;
                Ok(UploadOutcome::Imported(report))
            }
        }
    }

    /// Opens an existing database file in place, replacing any open one.
    pub async fn open_database(&mut self, path: &Path) -> Result<()> {
        let client = SqliteClient::open(path)
            .await?
            .with_max_rows(self.config.session.max_rows);
        self.replace_database(Box::new(client), path).await;
        info!(path = %path.display(), "Database opened");
        Ok(())
    }

    /// Imports a script file into the open database, or into a fresh
    /// `temp_database.db` in the workspace when none is open.
    pub async fn import_script(&mut self, path: &Path) -> Result<ImportReport> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ExplorerError::import(format!("Cannot read {}: {e}", path.display())))?;
        self.import_bytes(&bytes).await
    }

    /// Imports script contents. See [`Session::import_script`].
    pub async fn import_bytes(&mut self, bytes: &[u8]) -> Result<ImportReport> {
        if self.db.is_none() {
            self.create_temp_database().await?;
        }
        let db = self.database()?;
        Ok(import::import_script(db, bytes).await)
    }

    async fn create_temp_database(&mut self) -> Result<()> {
        let workspace = self.workspace().to_path_buf();
        tokio::fs::create_dir_all(&workspace).await.map_err(|e| {
            ExplorerError::import(format!("Cannot create workspace {}: {e}", workspace.display()))
        })?;

        let path = workspace.join(TEMP_DATABASE_NAME);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Replaced previous temporary database"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ExplorerError::import(format!(
                    "Cannot replace {}: {e}",
                    path.display()
                )))
            }
        }

        let client = SqliteClient::create(&path)
            .await?
            .with_max_rows(self.config.session.max_rows);
        self.replace_database(Box::new(client), &path).await;
        info!(path = %path.display(), "Created temporary database for script import");
        Ok(())
    }

    async fn replace_database(&mut self, client: Box<dyn DatabaseClient>, path: &Path) {
        if let Some(previous) = self.db.take() {
            if let Err(e) = previous.close().await {
                warn!(error = %e, "Failed to close previous database");
            }
        }
        self.db = Some(client);
        self.db_path = Some(path.to_path_buf());
    }

    /// Runs user-entered SQL. Completed results become the exportable result.
    pub async fn run_query(&mut self, sql: &str) -> Result<RunOutcome> {
        if sql.trim().is_empty() {
            return Ok(RunOutcome::Warning(EMPTY_QUERY_WARNING.to_string()));
        }

        let outcome = QueryExecutor::new(self.database()?).run(sql).await?;
        if let RunOutcome::Completed(completed) = &outcome {
            self.last_result = Some(completed.result.clone());
        }
        Ok(outcome)
    }

    /// Writes the last result as CSV to `path`, or to `query_results.csv` in
    /// the workspace.
    pub async fn export_csv(&self, path: Option<&Path>) -> Result<PathBuf> {
        let result = self
            .last_result
            .as_ref()
            .ok_or_else(|| ExplorerError::query("No query result to export. Run a query first."))?;

        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self.workspace().join(EXPORT_FILE_NAME),
        };
        write_csv(result, &path).await
    }

    /// Asks the chat agent a question.
    ///
    /// The question and the answer (or the error text) are appended to the
    /// transcript. Agent failures are reported in the reply, not as `Err`.
    pub async fn ask(&mut self, prompt: &str) -> Result<ChatReply> {
        let agent = self.agent.as_deref().ok_or_else(|| {
            ExplorerError::config("Chat is not configured. Set an LLM API key or use --llm mock.")
        })?;

        let history = self
            .transcript
            .recent_messages(self.config.chat.history_limit);
        self.transcript.push_user(prompt);

        let reply = match self.db.as_deref() {
            Some(db) => agent.answer(prompt, db, &history).await,
            None => Err(ExplorerError::connection(NO_DATABASE)),
        };

        match reply {
            Ok(answer) => {
                self.transcript.push_assistant(answer.answer.clone());
                if let Some(result) = &answer.result {
                    self.last_result = Some(result.clone());
                }
                Ok(ChatReply::Answered(answer))
            }
            Err(e) => {
                warn!(error = %e, "Chat prompt failed");
                self.transcript.push_assistant(e.to_string());
                Ok(ChatReply::Failed(e))
            }
        }
    }

    /// Reads the schema of the open database.
    pub async fn schema(&self) -> Result<Schema> {
        self.database()?.introspect_schema().await
    }

    /// Closes the open database. Calling it again does nothing.
    pub async fn close(&mut self) -> Result<()> {
        self.db_path = None;
        if let Some(db) = self.db.take() {
            db.close().await?;
            debug!("Session closed");
        }
        Ok(())
    }
}
