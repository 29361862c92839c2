//! Shared helpers for integration tests.

use std::path::{Path, PathBuf};

use sql_explorer::agent::{QueryAgent, SqlChain};
use sql_explorer::config::Config;
use sql_explorer::llm::LlmClient;
use sql_explorer::session::Session;
use tempfile::TempDir;

/// A session whose workspace is `dir`.
pub fn session_in(dir: &TempDir, agent: Option<Box<dyn QueryAgent>>) -> Session {
    let mut config = Config::default();
    config.session.workspace = dir.path().to_path_buf();
    Session::new(config, agent)
}

/// A read-only chat chain over `llm`.
pub fn chain(llm: impl LlmClient + 'static) -> Option<Box<dyn QueryAgent>> {
    Some(Box::new(SqlChain::new(Box::new(llm))))
}

/// Writes `contents` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write test file");
    path
}
