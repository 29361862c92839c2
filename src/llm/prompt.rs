//! Prompt construction for LLM requests.
//!
//! Builds the SQL-generation prompt with database schema context, and the
//! follow-up prompt that turns a query result into a prose answer.

use crate::db::Schema;
use crate::llm::types::Message;

/// System prompt template for the SQL assistant.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a SQL assistant for a SQLite database. Answer the user's questions by writing SQL.

DATABASE SCHEMA:
{schema}

INSTRUCTIONS:
- Generate only valid SQLite SQL (no SHOW, no information_schema; use sqlite_master)
- Write a single statement
- Use appropriate JOINs based on foreign keys
- Limit results to 100 rows unless the user specifies otherwise
- Only read data unless the user explicitly asks to change it
- If the question cannot be answered with the schema, explain why without SQL

OUTPUT FORMAT:
Return the SQL query wrapped in ```sql code blocks.
If you need to explain something, put it before or after the code block."#;

/// System prompt for narrating a query result.
const NARRATION_PROMPT: &str = "You explain SQL query results to a non-technical user. \
Answer the question in one or two short sentences using only the result provided. \
Do not include SQL in your answer.";

/// Marker line preceding the row count in narration requests.
pub const ROWS_RETURNED_LABEL: &str = "Rows returned:";

/// Builds the system prompt with the database schema injected.
pub fn build_system_prompt(schema: &Schema) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{schema}", &schema.format_for_llm())
}

/// Builds the message list for a SQL-generation request: system prompt,
/// prior conversation, then the question.
pub fn build_messages(schema: &Schema, history: &[Message], question: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(build_system_prompt(schema)));
    messages.extend(history.iter().cloned());
    messages.push(Message::user(question));
    messages
}

/// Builds the message list asking the LLM to describe a result in prose.
pub fn build_narration_messages(
    question: &str,
    sql: &str,
    row_count: usize,
    result_text: &str,
) -> Vec<Message> {
    let request = format!(
        "Question: {question}\n\nSQL:\n{sql}\n\n{ROWS_RETURNED_LABEL} {row_count}\n\nResult:\n{result_text}"
    );
    vec![Message::system(NARRATION_PROMPT), Message::user(request)]
}
