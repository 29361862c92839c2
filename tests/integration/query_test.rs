//! Query execution against uploaded databases.

use std::path::Path;

use pretty_assertions::assert_eq;
use sql_explorer::db::{DatabaseClient, SqliteClient, Value};
use sql_explorer::query::{RunOutcome, EMPTY_QUERY_WARNING};
use sql_explorer::session::UploadOutcome;
use sql_explorer::upload::UploadedArtifact;
use tempfile::TempDir;

use super::common::session_in;

async fn create_database(path: &Path, statements: &[&str]) {
    let db = SqliteClient::create(path).await.unwrap();
    for sql in statements {
        db.execute_statement(sql).await.unwrap();
    }
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_select_star_returns_rows_in_schema_order() {
    let source = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let db_path = source.path().join("sample.db");
    create_database(
        &db_path,
        &[
            "CREATE TABLE T (a INTEGER, b TEXT)",
            "INSERT INTO T VALUES (1, 'x'), (2, 'y')",
        ],
    )
    .await;

    let mut session = session_in(&workspace, None);
    let artifact = UploadedArtifact::from_path(&db_path).await.unwrap();
    match session.upload(artifact).await.unwrap() {
        UploadOutcome::Opened(path) => assert_eq!(path, workspace.path().join("sample.db")),
        other => panic!("Expected the database to open, got {other:?}"),
    }

    let RunOutcome::Completed(outcome) = session.run_query("SELECT * FROM T").await.unwrap() else {
        panic!("Expected a completed query");
    };
    assert_eq!(outcome.result.column_names(), vec!["a", "b"]);
    assert_eq!(
        outcome.result.rows,
        vec![
            vec![Value::Integer(1), Value::from("x")],
            vec![Value::Integer(2), Value::from("y")],
        ]
    );

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_uploaded_database_is_a_verbatim_copy() {
    let source = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let db_path = source.path().join("copy.sqlite");
    create_database(&db_path, &["CREATE TABLE t (a)"]).await;

    let mut session = session_in(&workspace, None);
    session
        .upload(UploadedArtifact::from_path(&db_path).await.unwrap())
        .await
        .unwrap();
    session.close().await.unwrap();

    assert_eq!(
        std::fs::read(workspace.path().join("copy.sqlite")).unwrap(),
        std::fs::read(&db_path).unwrap()
    );
}

#[tokio::test]
async fn test_blank_queries_are_not_executed() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);
    session.import_bytes(b"CREATE TABLE t (a);").await.unwrap();

    for input in ["", "   ", "\n\t "] {
        match session.run_query(input).await.unwrap() {
            RunOutcome::Warning(msg) => assert_eq!(msg, EMPTY_QUERY_WARNING),
            other => panic!("Expected a warning, got {other:?}"),
        }
    }
    assert!(session.last_result().is_none());
}

#[tokio::test]
async fn test_statement_without_columns_reports_rows_affected() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);
    session
        .import_bytes(b"CREATE TABLE t (a); INSERT INTO t VALUES (1), (2), (3);")
        .await
        .unwrap();

    let RunOutcome::Completed(outcome) = session.run_query("UPDATE t SET a = a + 1").await.unwrap()
    else {
        panic!("Expected a completed statement");
    };
    assert!(outcome.result.columns.is_empty());
    assert_eq!(outcome.result.rows_affected, Some(3));
}

#[tokio::test]
async fn test_query_errors_keep_the_session_usable() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);
    session.import_bytes(b"CREATE TABLE t (a);").await.unwrap();

    let err = session.run_query("SELEC * FROM t").await.unwrap_err();
    assert_eq!(err.category(), "Query Error");

    assert!(session.run_query("SELECT * FROM t").await.is_ok());
}

#[tokio::test]
async fn test_results_are_truncated_to_max_rows() {
    let workspace = TempDir::new().unwrap();
    let mut session = {
        let mut config = sql_explorer::config::Config::default();
        config.session.workspace = workspace.path().to_path_buf();
        config.session.max_rows = 5;
        sql_explorer::session::Session::new(config, None)
    };
    session
        .import_bytes(
            b"CREATE TABLE n (i INTEGER);
              WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 20)
              INSERT INTO n SELECT x FROM c;",
        )
        .await
        .unwrap();

    let RunOutcome::Completed(outcome) = session.run_query("SELECT i FROM n").await.unwrap() else {
        panic!("Expected a completed query");
    };
    assert_eq!(outcome.result.row_count, 5);
    assert_eq!(outcome.result.total_rows, Some(20));
    assert!(outcome.result.was_truncated);
}

#[tokio::test]
async fn test_unsupported_upload_is_rejected() {
    let workspace = TempDir::new().unwrap();
    let path = super::common::write_file(workspace.path(), "notes.txt", "hello");

    let err = UploadedArtifact::from_path(&path).await.unwrap_err();
    assert_eq!(err.category(), "Upload Error");
}
