//! CSV export of query results.

use pretty_assertions::assert_eq;
use sql_explorer::export::EXPORT_FILE_NAME;
use sql_explorer::present::{render_result, OutputFormat};
use sql_explorer::query::RunOutcome;
use tempfile::TempDir;

use super::common::session_in;

#[tokio::test]
async fn test_exported_csv_reparses_to_the_same_values() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);
    session
        .import_bytes(
            b"CREATE TABLE people (name TEXT, note TEXT);
              INSERT INTO people VALUES ('Smith, Jane', 'said \"hi\"');
              INSERT INTO people VALUES ('Bo', NULL);",
        )
        .await
        .unwrap();

    let RunOutcome::Completed(outcome) = session.run_query("SELECT * FROM people").await.unwrap()
    else {
        panic!("Expected a completed query");
    };
    let path = session.export_csv(None).await.unwrap();
    assert_eq!(path, workspace.path().join(EXPORT_FILE_NAME));

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["name", "note"]);

    let records: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    assert_eq!(
        records,
        vec![
            vec!["Smith, Jane".to_string(), "said \"hi\"".to_string()],
            vec!["Bo".to_string(), String::new()],
        ]
    );

    // The same values appear in the text rendering.
    let text = render_result(&outcome.result, OutputFormat::Text).unwrap();
    assert!(text.contains("Smith, Jane"));
    assert!(text.contains("said \"hi\""));
}

#[tokio::test]
async fn test_export_to_explicit_path() {
    let workspace = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);
    session
        .import_bytes(b"CREATE TABLE t (a INTEGER, b REAL); INSERT INTO t VALUES (1, 2.5);")
        .await
        .unwrap();
    session.run_query("SELECT a, b FROM t").await.unwrap();

    let target = out_dir.path().join("result.csv");
    let path = session.export_csv(Some(&target)).await.unwrap();

    assert_eq!(path, target);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "a,b\n1,2.5\n");
    assert!(!workspace.path().join(EXPORT_FILE_NAME).exists());
}

#[tokio::test]
async fn test_export_requires_a_result() {
    let workspace = TempDir::new().unwrap();
    let session = session_in(&workspace, None);

    let err = session.export_csv(None).await.unwrap_err();
    assert!(err.to_string().contains("Run a query first"));
}
