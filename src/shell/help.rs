//! Help text for shell commands.

/// Help text displayed for the /help command.
pub const HELP_TEXT: &str = r#"Available commands:
  /open <path>     - Upload a SQLite database (.db, .sqlite, .sqlite3) or a .sql script
  /import <path>   - Import a .sql script into the open database
  /sql <query>     - Execute SQL directly
  /export [path]   - Save the last result as CSV (default: query_results.csv)
  /schema          - Display tables and columns
  /history         - Show the chat transcript
  /help            - Show this help message
  /quit, /exit     - Exit

Anything else is sent to the chat assistant as a question about the data.
Scripts imported without an open database go into temp_database.db."#;

/// Banner printed when an interactive shell starts.
pub const WELCOME_TEXT: &str = "SQL Explorer. Type /help for commands.";
