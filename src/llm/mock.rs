//! Mock LLM clients for testing and offline use.
//!
//! `MockLlmClient` answers deterministically from the question and the table
//! names found in the system prompt; `FailingLlmClient` always errors.

use async_trait::async_trait;

use crate::error::{ExplorerError, Result};
use crate::llm::prompt::ROWS_RETURNED_LABEL;
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Reply when no pattern matches.
pub const MOCK_FALLBACK_REPLY: &str =
    "I don't understand that question. Could you please rephrase it?";

/// Mock LLM client that returns canned responses based on input patterns.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response), checked first.
    custom_responses: Vec<(String, String)>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the last user message contains `pattern` (case-insensitive), the
    /// mock returns `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses.push((pattern.into(), response.into()));
        self
    }

    fn mock_response(&self, messages: &[Message]) -> String {
        let input = last_user_message(messages);
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if let Some(rows) = narration_row_count(input) {
            return format!("The query returned {rows} row(s).");
        }

        let words: Vec<&str> = input_lower
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .collect();
        let counting = input_lower.contains("how many") || words.contains(&"count");

        if words.contains(&"tables") {
            return if counting {
                sql_block("SELECT COUNT(*) AS tables FROM sqlite_master WHERE type = 'table';")
            } else {
                sql_block("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name;")
            };
        }

        let tables = schema_tables(messages);
        let Some(table) = tables
            .iter()
            .find(|t| words.contains(&t.to_lowercase().as_str()))
        else {
            return MOCK_FALLBACK_REPLY.to_string();
        };

        if words.contains(&"delete") || words.contains(&"remove") {
            sql_block(&format!("DELETE FROM {table};"))
        } else if counting {
            sql_block(&format!("SELECT COUNT(*) FROM {table};"))
        } else {
            sql_block(&format!("SELECT * FROM {table} LIMIT 100;"))
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        Ok(self.mock_response(messages))
    }
}

/// LLM client whose every request fails with the configured message.
#[derive(Debug, Clone)]
pub struct FailingLlmClient {
    message: String,
}

impl FailingLlmClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl LlmClient for FailingLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String> {
        Err(ExplorerError::llm(self.message.clone()))
    }
}

fn sql_block(sql: &str) -> String {
    format!("```sql\n{sql}\n```")
}

fn last_user_message(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or_default()
}

fn narration_row_count(input: &str) -> Option<usize> {
    input
        .lines()
        .find_map(|line| line.strip_prefix(ROWS_RETURNED_LABEL))
        .and_then(|rest| rest.trim().parse().ok())
}

/// Table names listed as `Table: name` in the system prompt.
fn schema_tables(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.role == Role::System)
        .flat_map(|m| m.content.lines())
        .filter_map(|line| line.strip_prefix("Table: "))
        .map(|name| name.trim().to_string())
        .collect()
}
