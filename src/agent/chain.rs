//! LLM-backed question answering: question → SQL → result → prose.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{AgentAnswer, QueryAgent};
use crate::db::{DatabaseClient, QueryResult};
use crate::error::Result;
use crate::llm::{build_messages, build_narration_messages, parse_llm_response, LlmClient, Message};
use crate::present::ResultTable;
use crate::query::{ExecutionResult, QueryExecutor};

/// Rows of a result included in the narration request.
const NARRATION_ROW_LIMIT: usize = 50;

/// Answers questions by asking an LLM for SQL, running it, and asking the
/// LLM again to describe the result.
pub struct SqlChain {
    llm: Box<dyn LlmClient>,
    allow_writes: bool,
}

impl SqlChain {
    /// Creates a read-only chain.
    pub fn new(llm: Box<dyn LlmClient>) -> Self {
        Self {
            llm,
            allow_writes: false,
        }
    }

    /// Lets generated SQL modify the database.
    pub fn with_allow_writes(mut self, allow_writes: bool) -> Self {
        self.allow_writes = allow_writes;
        self
    }

    async fn narrate(&self, question: &str, sql: &str, result: &QueryResult) -> Result<String> {
        let preview = if result.rows.len() > NARRATION_ROW_LIMIT {
            QueryResult::with_data(
                result.columns.clone(),
                result.rows[..NARRATION_ROW_LIMIT].to_vec(),
            )
        } else {
            result.clone()
        };
        let result_text = ResultTable::new(&preview).render();

        let messages = build_narration_messages(
            question,
            sql,
            result.total_rows.unwrap_or(result.row_count),
            &result_text,
        );
        let narration = self.llm.complete(&messages).await?;
        Ok(narration.trim().to_string())
    }
}

#[async_trait]
impl QueryAgent for SqlChain {
    async fn answer(
        &self,
        question: &str,
        db: &dyn DatabaseClient,
        history: &[Message],
    ) -> Result<AgentAnswer> {
        let start = Instant::now();
        let schema = db.introspect_schema().await?;
        let messages = build_messages(&schema, history, question);
        debug!(message_count = messages.len(), "Sending question to LLM");

        let response = self.llm.complete(&messages).await?;
        let parsed = parse_llm_response(&response);

        let Some(sql) = parsed.sql else {
            info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "LLM answered without SQL"
            );
            return Ok(AgentAnswer::text(parsed.text));
        };
        debug!(%sql, "LLM generated SQL");

        let outcome = match QueryExecutor::new(db)
            .run_guarded(&sql, self.allow_writes)
            .await
        {
            ExecutionResult::Success(outcome) => outcome,
            ExecutionResult::Refused { sql, classification } => {
                let answer = format!(
                    "The generated SQL would modify the database, so it was not run.\n\n{sql}\n\n{}\nEnable chat.allow_writes (or pass --allow-writes) to allow this.",
                    classification.describe()
                );
                return Ok(AgentAnswer {
                    answer,
                    sql: Some(sql),
                    result: None,
                });
            }
            ExecutionResult::Error(e) => return Err(e),
        };

        let answer = self.narrate(question, &outcome.sql, &outcome.result).await?;
        info!(
            rows = outcome.result.row_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Question answered"
        );

        Ok(AgentAnswer {
            answer,
            sql: Some(outcome.sql),
            result: Some(outcome.result),
        })
    }
}
