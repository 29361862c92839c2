//! Best-effort script import.

use pretty_assertions::assert_eq;
use sql_explorer::import::{ImportStatus, ScriptEncoding, StatementStatus};
use sql_explorer::query::RunOutcome;
use sql_explorer::session::UploadOutcome;
use sql_explorer::upload::{UploadedArtifact, TEMP_DATABASE_NAME};
use tempfile::TempDir;

use super::common::{session_in, write_file};

#[tokio::test]
async fn test_failing_statement_does_not_stop_the_rest() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);

    let report = session
        .import_bytes(b"CREATE TABLE a (x);\nINSERT INTO missing VALUES (1);\nINSERT INTO a VALUES (7);")
        .await
        .unwrap();

    assert_eq!(report.status(), ImportStatus::Partial);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.index, 2);
    match &failure.status {
        StatementStatus::Failed { reason } => assert!(reason.contains("no such table")),
        other => panic!("Expected failure, got {other:?}"),
    }

    let RunOutcome::Completed(outcome) = session.run_query("SELECT x FROM a").await.unwrap() else {
        panic!("Expected a completed query");
    };
    assert_eq!(outcome.result.row_count, 1);
}

#[tokio::test]
async fn test_go_separators() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);

    let report = session
        .import_bytes(b"CREATE TABLE A(x);\nGO\nCREATE TABLE B(y);")
        .await
        .unwrap();

    assert_eq!(report.status(), ImportStatus::Complete);
    let schema = session.schema().await.unwrap();
    assert!(schema.table("A").is_some());
    assert!(schema.table("B").is_some());
}

#[tokio::test]
async fn test_utf16_script_with_bom() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);

    let script = "CREATE TABLE café (nom TEXT);\nINSERT INTO café VALUES ('crème');";
    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend(script.encode_utf16().flat_map(u16::to_le_bytes));

    let report = session.import_bytes(&bytes).await.unwrap();

    assert_eq!(report.encoding, ScriptEncoding::Utf16);
    assert_eq!(report.status(), ImportStatus::Complete);
    let RunOutcome::Completed(outcome) = session.run_query("SELECT nom FROM café").await.unwrap()
    else {
        panic!("Expected a completed query");
    };
    assert_eq!(outcome.result.rows[0][0].to_display_string(), "crème");
}

#[tokio::test]
async fn test_latin1_script() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);

    // 0xE9 is "é" in Latin-1 and invalid on its own in UTF-8.
    let bytes = b"CREATE TABLE t (s TEXT);\nINSERT INTO t VALUES ('caf\xE9');".to_vec();

    let report = session.import_bytes(&bytes).await.unwrap();

    assert_eq!(report.encoding, ScriptEncoding::Latin1);
    assert_eq!(report.status(), ImportStatus::Complete);
    let RunOutcome::Completed(outcome) = session.run_query("SELECT s FROM t").await.unwrap() else {
        panic!("Expected a completed query");
    };
    assert_eq!(outcome.result.rows[0][0].to_display_string(), "café");
}

#[tokio::test]
async fn test_script_upload_without_database_uses_temp_database() {
    let workspace = TempDir::new().unwrap();
    let path = write_file(workspace.path(), "seed.sql", "CREATE TABLE t (a);");
    let mut session = session_in(&workspace, None);

    let artifact = UploadedArtifact::from_path(&path).await.unwrap();
    let UploadOutcome::Imported(report) = session.upload(artifact).await.unwrap() else {
        panic!("Expected the script to be imported");
    };

    assert!(report.is_success());
    assert_eq!(
        session.database_path(),
        Some(workspace.path().join(TEMP_DATABASE_NAME).as_path())
    );
    assert!(workspace.path().join(TEMP_DATABASE_NAME).is_file());
}

#[tokio::test]
async fn test_script_imports_into_open_database() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);
    session.import_bytes(b"CREATE TABLE first (a);").await.unwrap();

    let path = write_file(workspace.path(), "more.sql", "CREATE TABLE second (b);");
    session.import_script(&path).await.unwrap();

    let schema = session.schema().await.unwrap();
    assert!(schema.table("first").is_some());
    assert!(schema.table("second").is_some());
}

#[tokio::test]
async fn test_empty_and_all_failing_scripts() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);

    let empty = session.import_bytes(b"  ;\n ; ").await.unwrap();
    assert_eq!(empty.status(), ImportStatus::Empty);

    let failed = session
        .import_bytes(b"DROP TABLE nope; INSERT INTO nope VALUES (1);")
        .await
        .unwrap();
    assert_eq!(failed.status(), ImportStatus::Failed);
    assert!(!failed.is_success());
}

#[tokio::test]
async fn test_missing_script_is_an_import_error() {
    let workspace = TempDir::new().unwrap();
    let mut session = session_in(&workspace, None);

    let err = session
        .import_script(&workspace.path().join("absent.sql"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "Import Error");
    assert!(session.database_path().is_none());
}
