//! End-to-end runs of the `sql-explorer` binary.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tempfile::TempDir;

use super::common::write_file;

const SEED: &str = "CREATE TABLE tracks (id INTEGER, name TEXT);\n\
                    INSERT INTO tracks VALUES (1, 'Intro');\n\
                    INSERT INTO tracks VALUES (2, 'Outro');\n";

/// Runs the binary inside `home` with no API keys in the environment.
fn run(home: &Path, args: &[&str], stdin: Option<&str>) -> (i32, String, String) {
    let config = home.join("absent-config.toml");
    let mut child = Command::new(env!("CARGO_BIN_EXE_sql-explorer"))
        .args(["--config", config.to_str().unwrap(), "--workspace"])
        .arg(home)
        .args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_STATE_HOME", home.join(".state"))
        .env("RUST_LOG", "warn")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start sql-explorer");

    {
        let mut child_stdin = child.stdin.take().unwrap();
        if let Some(input) = stdin {
            child_stdin.write_all(input.as_bytes()).unwrap();
        }
    }

    let output = child.wait_with_output().expect("Failed to wait for sql-explorer");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn test_one_shot_script_and_query() {
    let home = TempDir::new().unwrap();
    let script = write_file(home.path(), "seed.sql", SEED);

    let (code, stdout, stderr) = run(
        home.path(),
        &[
            "--script",
            script.to_str().unwrap(),
            "--query",
            "SELECT * FROM tracks",
        ],
        None,
    );

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Imported 3 statement(s) (utf-8)."));
    assert!(stdout.contains("│ 2    │ Outro │"));
    assert!(stdout.contains("2 rows returned"));
    assert!(home.path().join("temp_database.db").is_file());
}

#[test]
fn test_one_shot_json_and_export() {
    let home = TempDir::new().unwrap();
    let script = write_file(home.path(), "seed.sql", SEED);

    let (code, stdout, stderr) = run(
        home.path(),
        &[
            "--script",
            script.to_str().unwrap(),
            "--query",
            "SELECT name FROM tracks ORDER BY id",
            "--format",
            "json",
            "--export",
        ],
        None,
    );

    assert_eq!(code, 0, "stderr: {stderr}");
    let docs: Vec<serde_json::Value> = serde_json::Deserializer::from_str(&stdout)
        .into_iter::<serde_json::Value>()
        .take_while(Result::is_ok)
        .map(Result::unwrap)
        .collect();
    assert_eq!(docs[0]["status"], "complete");
    assert_eq!(docs[1]["columns"], serde_json::json!(["name"]));
    assert_eq!(docs[1]["rows"], serde_json::json!([["Intro"], ["Outro"]]));
    assert_eq!(
        std::fs::read_to_string(home.path().join("query_results.csv")).unwrap(),
        "name\nIntro\nOutro\n"
    );
}

#[test]
fn test_query_without_database_fails() {
    let home = TempDir::new().unwrap();

    let (code, stdout, stderr) = run(home.path(), &["--query", "SELECT 1"], None);

    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("No database open"));
}

#[test]
fn test_ask_with_mock_provider() {
    let home = TempDir::new().unwrap();
    let script = write_file(home.path(), "seed.sql", SEED);

    let (code, stdout, stderr) = run(
        home.path(),
        &[
            "--llm",
            "mock",
            "--script",
            script.to_str().unwrap(),
            "--ask",
            "How many tracks are there?",
        ],
        None,
    );

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("SELECT COUNT(*) FROM tracks;"));
    assert!(stdout.contains("assistant: The query returned 1 row(s)."));
}

#[test]
fn test_failed_ask_exits_non_zero() {
    let home = TempDir::new().unwrap();

    let (code, stdout, _) = run(
        home.path(),
        &["--llm", "mock", "--ask", "How many tracks?"],
        None,
    );

    assert_eq!(code, 1);
    assert!(stdout.contains("assistant: Connection error: No database open"));
}

#[test]
fn test_missing_api_key_is_fatal_for_chat() {
    let home = TempDir::new().unwrap();

    let (code, _, stderr) = run(home.path(), &["--llm", "openai", "--ask", "Hello?"], None);

    assert_eq!(code, 1);
    assert!(stderr.contains("No API key configured"));
    assert!(stderr.contains("OPENAI_API_KEY"));
}

#[test]
fn test_api_key_not_needed_without_chat() {
    let home = TempDir::new().unwrap();
    let script = write_file(home.path(), "seed.sql", SEED);

    let (code, _, stderr) = run(
        home.path(),
        &[
            "--llm",
            "openai",
            "--script",
            script.to_str().unwrap(),
            "--query",
            "SELECT 1",
        ],
        None,
    );

    assert_eq!(code, 0, "stderr: {stderr}");
}

#[test]
fn test_api_key_from_secrets_file() {
    let home = TempDir::new().unwrap();
    write_file(home.path(), "secrets.toml", "OPENAI_API_KEY = \"sk-test\"\n");

    // The key is found, so the shell starts; /help sends nothing to the provider.
    let (code, stdout, stderr) = run(home.path(), &["--llm", "openai"], Some("/help\n"));

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Available commands:"));
}

#[test]
fn test_shell_reads_piped_commands() {
    let home = TempDir::new().unwrap();
    write_file(home.path(), "seed.sql", SEED);

    let input = "/import seed.sql\n\
                 /sql SELECT COUNT(*) AS n FROM tracks\n\
                 /sql\n\
                 how many tracks?\n\
                 /history\n\
                 /quit\n\
                 /sql SELECT 'never'\n";
    let (code, stdout, stderr) = run(home.path(), &["--llm", "mock"], Some(input));

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Imported 3 statement(s) (utf-8)."));
    assert!(stdout.contains("│ n    │"));
    assert!(stdout.contains("Warning: Please enter a valid SQL query."));
    assert!(stdout.contains("user: how many tracks?"));
    assert!(!stdout.contains("never"));
}
