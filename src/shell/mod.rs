//! Line-oriented interactive shell.
//!
//! Reads commands and chat prompts one line at a time, runs them against the
//! session and prints the rendered output. The session is closed on every
//! way out: `/quit`, end of input, or a failed write.

mod handlers;
mod help;
mod output;
mod router;

pub use handlers::dispatch;
pub use help::{HELP_TEXT, WELCOME_TEXT};
pub use output::CommandOutput;
pub use router::{Command, CommandRouter};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::error::Result;
use crate::present::OutputFormat;
use crate::session::Session;

/// Prompt shown before each line when attached to a terminal.
pub const PROMPT: &str = "sql-explorer> ";

/// Shell presentation settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellOptions {
    pub format: OutputFormat,
    /// Print the banner and a prompt before each line.
    pub interactive: bool,
}

/// Runs the shell until `/quit` or end of input, then closes the session.
pub async fn run<R, W>(
    session: &mut Session,
    input: R,
    output: &mut W,
    options: ShellOptions,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let outcome = run_loop(session, input, output, options).await;
    let closed = session.close().await;
    outcome.and(closed)
}

async fn run_loop<R, W>(
    session: &mut Session,
    input: R,
    output: &mut W,
    options: ShellOptions,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if options.interactive {
        write_text(output, WELCOME_TEXT).await?;
    }

    let mut lines = input.lines();
    loop {
        if options.interactive {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;
        }

        let Some(line) = lines.next_line().await? else {
            info!("End of input, leaving shell");
            break;
        };

        let command = CommandRouter::parse(&line);
        let result = dispatch(session, command).await;
        if let Some(text) = result.render(options.format)? {
            write_text(output, &text).await?;
        }
        if result.is_exit() {
            info!("Quit requested, leaving shell");
            break;
        }
    }
    Ok(())
}

/// Runs `commands` in order without reading input. Errors go to `errors`,
/// everything else to `output`. Returns false if any command failed.
///
/// The session stays open; callers close it when they are done.
pub async fn run_commands<W, E>(
    session: &mut Session,
    commands: Vec<Command>,
    output: &mut W,
    errors: &mut E,
    format: OutputFormat,
) -> Result<bool>
where
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut ok = true;
    for command in commands {
        let result = dispatch(session, command).await;
        let Some(text) = result.render(format)? else {
            continue;
        };
        if result.is_failure() {
            ok = false;
        }
        if result.is_error() {
            write_text(errors, &text).await?;
        } else {
            write_text(output, &text).await?;
        }
    }
    Ok(ok)
}

async fn write_text<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{QueryAgent, SqlChain};
    use crate::config::Config;
    use crate::llm::{FailingLlmClient, MockLlmClient};
    use tempfile::TempDir;

    async fn run_script(
        dir: &TempDir,
        agent: Option<Box<dyn QueryAgent>>,
        script: &str,
    ) -> (Session, String) {
        let mut config = Config::default();
        config.session.workspace = dir.path().to_path_buf();
        let mut session = Session::new(config, agent);
        let mut out = Vec::new();

        run(&mut session, script.as_bytes(), &mut out, ShellOptions::default())
            .await
            .unwrap();
        (session, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_import_query_and_export() {
        let dir = TempDir::new().unwrap();
        let script_path = dir.path().join("seed.sql");
        std::fs::write(
            &script_path,
            "CREATE TABLE t (a, b);\nINSERT INTO t VALUES (1, 'x');\nINSERT INTO t VALUES (2, 'y');",
        )
        .unwrap();

        let input = format!(
            "/import {}\n/sql SELECT * FROM t\n/export\n/quit\n",
            script_path.display()
        );
        let (session, out) = run_script(&dir, None, &input).await;

        assert!(out.contains("Imported 3 statement(s) (utf-8)."));
        assert!(out.contains("│ 2    │ y    │"));
        assert!(out.contains("2 rows returned"));
        assert!(out.contains("Exported 2 row(s) to"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("query_results.csv")).unwrap(),
            "a,b\n1,x\n2,y\n"
        );
        assert!(session.database_path().is_none(), "session closed on quit");
    }

    #[tokio::test]
    async fn test_blank_sql_warns() {
        let dir = TempDir::new().unwrap();
        let (_, out) = run_script(&dir, None, "/sql   \n").await;
        assert_eq!(out, "Warning: Please enter a valid SQL query.\n");
    }

    #[tokio::test]
    async fn test_errors_do_not_stop_the_shell() {
        let dir = TempDir::new().unwrap();
        let (_, out) = run_script(&dir, None, "/sql SELECT 1\n/bogus\n/help\n").await;

        assert!(out.contains("Connection error: No database open"));
        assert!(out.contains("Unknown command: /bogus"));
        assert!(out.contains("Available commands:"));
    }

    #[tokio::test]
    async fn test_chat_without_agent_is_reported() {
        let dir = TempDir::new().unwrap();
        let (session, out) = run_script(&dir, None, "how many rows?\n").await;

        assert!(out.contains("Chat is not configured"));
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_chat_failure_then_history() {
        let dir = TempDir::new().unwrap();
        let agent: Box<dyn QueryAgent> =
            Box::new(SqlChain::new(Box::new(FailingLlmClient::new("quota exceeded"))));
        let script = "/import missing.sql\nWhat is in here?\n/history\n";
        let (session, out) = run_script(&dir, Some(agent), script).await;

        assert!(out.contains("Import error: Cannot read missing.sql"));
        assert!(out.contains("assistant: Connection error: No database open"));
        assert_eq!(session.transcript().len(), 2);
        assert!(out.ends_with(
            "user: What is in here?\n\nassistant: Connection error: No database open. Upload a database with /open or a script with /import.\n"
        ));
    }

    #[tokio::test]
    async fn test_chat_answer_shows_sql_and_result() {
        let dir = TempDir::new().unwrap();
        let script_path = dir.path().join("seed.sql");
        std::fs::write(
            &script_path,
            "CREATE TABLE albums (title TEXT);\nINSERT INTO albums VALUES ('Ten');",
        )
        .unwrap();
        let agent: Box<dyn QueryAgent> =
            Box::new(SqlChain::new(Box::new(MockLlmClient::new())));

        let input = format!("/import {}\nhow many albums?\n", script_path.display());
        let (session, out) = run_script(&dir, Some(agent), &input).await;

        assert!(out.contains("SELECT COUNT(*) FROM albums;"));
        assert!(out.contains("assistant: The query returned 1 row(s)."));
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_run_commands_splits_errors() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.session.workspace = dir.path().to_path_buf();
        let mut session = Session::new(config, None);
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let ok = run_commands(
            &mut session,
            vec![
                Command::Sql("SELECT 1".to_string()),
                Command::Help,
            ],
            &mut out,
            &mut err,
            OutputFormat::Text,
        )
        .await
        .unwrap();

        assert!(!ok);
        assert!(String::from_utf8(err).unwrap().starts_with("Connection error:"));
        assert!(String::from_utf8(out).unwrap().starts_with("Available commands:"));
    }

    #[tokio::test]
    async fn test_run_commands_reports_failed_chat_turn() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.session.workspace = dir.path().to_path_buf();
        let agent = SqlChain::new(Box::new(FailingLlmClient::new("rate limited")));
        let mut session = Session::new(config, Some(Box::new(agent)));
        session.import_bytes(b"CREATE TABLE t (a);").await.unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let ok = run_commands(
            &mut session,
            vec![Command::Chat("How many rows in t?".to_string())],
            &mut out,
            &mut err,
            OutputFormat::Text,
        )
        .await
        .unwrap();

        assert!(!ok);
        assert!(err.is_empty());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "assistant: LLM error: rate limited\n"
        );
    }

    #[tokio::test]
    async fn test_interactive_prints_banner_and_prompt() {
        let mut session = Session::new(Config::default(), None);
        let mut out = Vec::new();
        let options = ShellOptions {
            interactive: true,
            ..ShellOptions::default()
        };

        run(&mut session, "/quit\n".as_bytes(), &mut out, options)
            .await
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, format!("{WELCOME_TEXT}\n{PROMPT}"));
    }
}
