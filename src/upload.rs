//! Upload handling: classify incoming files and persist them to the workspace.

use crate::error::{ExplorerError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the database created when a script arrives without one.
pub const TEMP_DATABASE_NAME: &str = "temp_database.db";

const DATABASE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];
const SCRIPT_EXTENSIONS: &[&str] = &["sql"];

/// What an uploaded file is, judged by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A SQLite database file.
    Database,
    /// A text file of SQL statements.
    Script,
}

impl ArtifactKind {
    /// Classifies a file name by extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if DATABASE_EXTENSIONS.contains(&extension.as_str()) {
            Ok(ArtifactKind::Database)
        } else if SCRIPT_EXTENSIONS.contains(&extension.as_str()) {
            Ok(ArtifactKind::Script)
        } else {
            Err(ExplorerError::upload(format!(
                "Unsupported file type for '{file_name}': expected .db, .sqlite, .sqlite3 or .sql"
            )))
        }
    }
}

/// A file handed to the session.
#[derive(Debug, Clone)]
pub struct UploadedArtifact {
    /// Bare file name; directory components are stripped.
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub kind: ArtifactKind,
    source: Option<PathBuf>,
}

impl UploadedArtifact {
    /// Creates an artifact from a name and its contents.
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Result<Self> {
        let file_name = sanitize_file_name(file_name)?;
        let kind = ArtifactKind::from_file_name(&file_name)?;
        Ok(Self {
            file_name,
            bytes,
            kind,
            source: None,
        })
    }

    /// Reads an artifact from disk.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ExplorerError::upload(format!("Invalid file path: {}", path.display())))?;
        // Classify before reading so unsupported files are rejected cheaply.
        ArtifactKind::from_file_name(name)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ExplorerError::upload(format!("Cannot read {}: {e}", path.display())))?;
        debug!(path = %path.display(), size = bytes.len(), "Read uploaded file");

        let mut artifact = Self::new(name, bytes)?;
        artifact.source = Some(path.to_path_buf());
        Ok(artifact)
    }

    /// Writes the artifact into `dir` under its file name and returns the path.
    ///
    /// An artifact read from that very path is left in place.
    pub async fn persist(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            ExplorerError::upload(format!("Cannot create workspace {}: {e}", dir.display()))
        })?;
        let destination = dir.join(&self.file_name);

        if let Some(source) = &self.source {
            if same_file(source, &destination) {
                debug!(path = %destination.display(), "Upload already in workspace");
                return Ok(destination);
            }
        }

        tokio::fs::write(&destination, &self.bytes).await.map_err(|e| {
            ExplorerError::upload(format!("Cannot write {}: {e}", destination.display()))
        })?;
        info!(path = %destination.display(), size = self.bytes.len(), "Persisted upload");
        Ok(destination)
    }
}

fn sanitize_file_name(file_name: &str) -> Result<String> {
    // Accept both separators regardless of platform.
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(ExplorerError::upload(format!(
            "Invalid upload file name: '{file_name}'"
        )));
    }
    Ok(name.to_string())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
