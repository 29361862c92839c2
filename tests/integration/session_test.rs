//! Chat and session lifecycle.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use sql_explorer::agent::{AgentAnswer, QueryAgent, SqlChain};
use sql_explorer::config::Config;
use sql_explorer::db::DatabaseClient;
use sql_explorer::error::{ExplorerError, Result};
use sql_explorer::llm::{FailingLlmClient, Message, MockLlmClient, Role};
use sql_explorer::query::RunOutcome;
use sql_explorer::session::{ChatReply, Session, TranscriptEntry};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use super::common::{chain, session_in};

const SEED: &[u8] = b"CREATE TABLE tracks (id INTEGER PRIMARY KEY, name TEXT);
INSERT INTO tracks (name) VALUES ('One'), ('Two'), ('Three');";

/// Agent that fails on questions containing "fail" and records the history
/// it was given.
struct ScriptedAgent {
    histories: Arc<Mutex<Vec<Vec<Message>>>>,
}

#[async_trait]
impl QueryAgent for ScriptedAgent {
    async fn answer(
        &self,
        question: &str,
        _db: &dyn DatabaseClient,
        history: &[Message],
    ) -> Result<AgentAnswer> {
        self.histories.lock().unwrap().push(history.to_vec());
        if question.contains("fail") {
            Err(ExplorerError::llm("upstream timeout"))
        } else {
            Ok(AgentAnswer::text(format!("answer to {question}")))
        }
    }
}

#[tokio::test]
async fn test_agent_failure_is_recorded_and_session_continues() {
    let workspace = TempDir::new().unwrap();
    let histories = Arc::new(Mutex::new(Vec::new()));
    let agent = ScriptedAgent {
        histories: Arc::clone(&histories),
    };
    let mut session = session_in(&workspace, Some(Box::new(agent)));
    session.import_bytes(SEED).await.unwrap();

    session.ask("first").await.unwrap();
    let before: Vec<TranscriptEntry> = session.transcript().entries().to_vec();

    let reply = session.ask("please fail").await.unwrap();
    assert!(matches!(reply, ChatReply::Failed(ExplorerError::Llm(_))));

    let entries = session.transcript().entries();
    assert_eq!(entries.len(), 4);
    assert_eq!(&entries[..2], before.as_slice());
    assert_eq!(entries[2], TranscriptEntry::new(Role::User, "please fail"));
    assert_eq!(entries[3].role, Role::Assistant);
    assert!(entries[3].content.contains("upstream timeout"));

    // Still usable afterwards.
    session.ask("again").await.unwrap();
    assert_eq!(session.transcript().len(), 6);
    assert!(session.run_query("SELECT * FROM tracks").await.is_ok());

    // Each question saw the earlier turns but not itself.
    let histories = histories.lock().unwrap();
    assert!(histories[0].is_empty());
    assert_eq!(
        histories[1],
        vec![Message::user("first"), Message::assistant("answer to first")]
    );
    assert_eq!(histories[2].len(), 4);
}

#[tokio::test]
async fn test_history_is_limited() {
    let workspace = TempDir::new().unwrap();
    let histories = Arc::new(Mutex::new(Vec::new()));
    let agent = ScriptedAgent {
        histories: Arc::clone(&histories),
    };
    let mut config = Config::default();
    config.session.workspace = workspace.path().to_path_buf();
    config.chat.history_limit = 2;
    let mut session = Session::new(config, Some(Box::new(agent)));
    session.import_bytes(SEED).await.unwrap();

    for question in ["a", "b", "c"] {
        session.ask(question).await.unwrap();
    }

    let histories = histories.lock().unwrap();
    assert_eq!(
        histories[2],
        vec![Message::user("b"), Message::assistant("answer to b")]
    );
    assert_eq!(session.transcript().len(), 6);
}

#[tokio::test]
async fn test_llm_failure_through_the_chain() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, chain(FailingLlmClient::new("rate limited")));
    session.import_bytes(SEED).await.unwrap();

    session.ask("How many tracks?").await.unwrap();

    let entries = session.transcript().entries();
    assert_eq!(entries[1].content, "LLM error: rate limited");
}

#[tokio::test]
async fn test_chain_refuses_delete_unless_allowed() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, chain(MockLlmClient::new()));
    session.import_bytes(SEED).await.unwrap();

    let ChatReply::Answered(answer) = session.ask("Delete all tracks").await.unwrap() else {
        panic!("Expected an answer");
    };
    assert_eq!(answer.sql.as_deref(), Some("DELETE FROM tracks;"));
    assert!(answer.result.is_none());
    let RunOutcome::Completed(count) = session.run_query("SELECT * FROM tracks").await.unwrap()
    else {
        panic!("Expected a completed query");
    };
    assert_eq!(count.result.row_count, 3);
    session.close().await.unwrap();

    let agent = SqlChain::new(Box::new(MockLlmClient::new())).with_allow_writes(true);
    let mut session = session_in(&workspace, Some(Box::new(agent)));
    session
        .open_database(&workspace.path().join("temp_database.db"))
        .await
        .unwrap();
    let ChatReply::Answered(answer) = session.ask("Delete all tracks").await.unwrap() else {
        panic!("Expected an answer");
    };
    assert_eq!(answer.result.and_then(|r| r.rows_affected), Some(3));
}

#[tokio::test]
async fn test_close_is_idempotent_and_queries_fail_afterwards() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, chain(MockLlmClient::new()));
    session.import_bytes(SEED).await.unwrap();

    session.close().await.unwrap();
    session.close().await.unwrap();

    let err = session.run_query("SELECT * FROM tracks").await.unwrap_err();
    assert_eq!(err.category(), "Connection Error");
    assert!(session.schema().await.is_err());

    // A chat prompt after teardown is answered with the connection error.
    let reply = session.ask("How many tracks?").await.unwrap();
    assert!(matches!(reply, ChatReply::Failed(ExplorerError::Connection(_))));
}
