//! Response parsing for LLM outputs.
//!
//! Extracts SQL from LLM responses that may contain markdown code blocks.

use regex::Regex;
use std::sync::OnceLock;

/// Result of parsing an LLM response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Any explanatory text before or after the SQL.
    pub text: String,
    /// Extracted SQL query, if found.
    pub sql: Option<String>,
}

impl ParsedResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: None,
        }
    }

    pub fn with_sql(text: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: Some(sql.into()),
        }
    }
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```([A-Za-z0-9_+-]*)[ \t]*\r?\n(.*?)```").expect("fence pattern is valid")
    })
}

/// Parses an LLM response to extract SQL.
///
/// Preference order: the first ```sql block, then the first unlabelled block,
/// then a bare response that is itself a SELECT or WITH query. Blocks in
/// other languages are ignored.
pub fn parse_llm_response(response: &str) -> ParsedResponse {
    let blocks: Vec<regex::Captures<'_>> = fence_pattern().captures_iter(response).collect();

    let chosen = blocks
        .iter()
        .find(|c| c[1].eq_ignore_ascii_case("sql"))
        .or_else(|| blocks.iter().find(|c| c[1].is_empty()));

    if let Some(block) = chosen {
        if let Some(whole) = block.get(0) {
            let text = format!(
                "{}\n{}",
                response[..whole.start()].trim_end(),
                response[whole.end()..].trim_start()
            );
            return ParsedResponse::with_sql(text.trim(), block[2].trim());
        }
    }

    let trimmed = response.trim();
    if trimmed.starts_with("SELECT ") || trimmed.starts_with("WITH ") {
        return ParsedResponse::with_sql("", trimmed);
    }

    ParsedResponse::text_only(trimmed)
}
