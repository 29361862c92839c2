//! Natural-language question answering over the open database.
//!
//! A [`QueryAgent`] turns a question into an answer, usually by writing and
//! running SQL. [`SqlChain`] is the LLM-backed implementation; the session
//! accepts any agent so tests can inject their own.

mod chain;

pub use chain::SqlChain;

use async_trait::async_trait;

use crate::db::{DatabaseClient, QueryResult};
use crate::error::Result;
use crate::llm::Message;

/// The agent's reply to one question.
#[derive(Debug, Clone)]
pub struct AgentAnswer {
    /// Prose answer shown in the transcript.
    pub answer: String,
    /// SQL the agent generated, if any.
    pub sql: Option<String>,
    /// Result of running that SQL, if it ran.
    pub result: Option<QueryResult>,
}

impl AgentAnswer {
    /// An answer that involved no SQL.
    pub fn text(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sql: None,
            result: None,
        }
    }
}

/// Answers natural-language questions about a database.
#[async_trait]
pub trait QueryAgent: Send + Sync {
    /// Answers `question`, given the prior conversation in `history`.
    async fn answer(
        &self,
        question: &str,
        db: &dyn DatabaseClient,
        history: &[Message],
    ) -> Result<AgentAnswer>;
}
