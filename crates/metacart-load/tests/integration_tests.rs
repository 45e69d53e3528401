//! Integration tests for the spreadsheet loader
//!
//! These tests drive the public loading surface end to end against the
//! mock executor: input resolution over real files and archives, then
//! provisioning and insertion across multiple sheets and tables. No
//! database credentials are required.
//!
//! ```bash
//! cargo test -p metacart-load --test integration_tests
//! ```

use metacart_load::{
    find_input_file, resolve_inputs, LoadError, LoadOptions, LoadSession, MockExecutor, SqlValue,
};
use metacart_core::{parse_timestamp, CellValue, Dialect, SheetTable};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime};

fn options(dialect: Dialect, drop: bool, truncate: bool) -> LoadOptions {
    LoadOptions {
        dialect,
        schema: Some("dw".to_string()),
        drop_tables: drop,
        truncate_tables: truncate,
        debug: false,
    }
}

fn sheet(name: &str, rows: Vec<Vec<CellValue>>) -> SheetTable {
    SheetTable::new(name, vec!["id".to_string(), "label".to_string()], rows)
}

fn two_rows() -> Vec<Vec<CellValue>> {
    vec![
        vec![CellValue::Int(1), CellValue::Text("alpha".to_string())],
        vec![CellValue::Int(2), CellValue::Text("beta".to_string())],
    ]
}

// =============================================================================
// Provisioning across a whole run
// =============================================================================

#[tokio::test]
async fn fresh_run_creates_each_table_once_and_appends_repeats() {
    let mut session = LoadSession::new(
        MockExecutor::new(),
        options(Dialect::Postgres, false, false),
    );

    // Two different tables, the first seen twice (e.g. two files both
    // carrying a "Business Terms" sheet).
    session
        .load_sheet(&sheet("Business Terms", two_rows()))
        .await
        .unwrap();
    session
        .load_sheet(&sheet("Owners", two_rows()))
        .await
        .unwrap();
    session
        .load_sheet(&sheet("Business Terms", two_rows()))
        .await
        .unwrap();

    let executor = session.into_executor();
    let creates: Vec<_> = executor
        .statements()
        .iter()
        .filter(|s| s.contains("CREATE TABLE"))
        .collect();
    assert_eq!(creates.len(), 2);
    assert!(creates[0].contains("\"dw\".\"Business_Terms\""));
    assert!(creates[1].contains("\"dw\".\"Owners\""));

    // Three sheets, three inserts.
    assert_eq!(executor.batches().len(), 3);
}

#[tokio::test]
async fn drop_mode_over_existing_tables_is_idempotent_per_run() {
    let executor = MockExecutor::new()
        .with_existing_table("Business_Terms")
        .with_existing_table("Owners");
    let mut session = LoadSession::new(executor, options(Dialect::SqlServer, true, false));

    session
        .load_sheet(&sheet("Business Terms", two_rows()))
        .await
        .unwrap();
    session
        .load_sheet(&sheet("Business Terms", two_rows()))
        .await
        .unwrap();
    session
        .load_sheet(&sheet("Owners", two_rows()))
        .await
        .unwrap();

    let executor = session.into_executor();
    let drops = executor
        .statements()
        .iter()
        .filter(|s| s.contains("DROP TABLE"))
        .count();
    let creates = executor
        .statements()
        .iter()
        .filter(|s| s.contains("CREATE TABLE"))
        .count();
    // One drop+create per distinct table, not per sheet.
    assert_eq!(drops, 2);
    assert_eq!(creates, 2);
    assert_eq!(executor.batches().len(), 3);
}

#[tokio::test]
async fn timestamp_columns_load_as_iso_strings() {
    let ts = parse_timestamp("2024-06-01 08:30:00").unwrap();
    let table = SheetTable::new(
        "Audit",
        vec!["seen_at".to_string()],
        vec![vec![CellValue::Timestamp(ts)]],
    );

    let mut session = LoadSession::new(
        MockExecutor::new(),
        options(Dialect::Postgres, false, false),
    );
    session.load_sheet(&table).await.unwrap();

    let executor = session.into_executor();
    let create = executor
        .statements()
        .iter()
        .find(|s| s.contains("CREATE TABLE"))
        .unwrap();
    assert!(create.contains("\"seen_at\" TIMESTAMP"), "got: {}", create);
    assert_eq!(
        executor.batches()[0].1[0],
        vec![SqlValue::Text("2024-06-01T08:30:00".to_string())]
    );
}

#[tokio::test]
async fn provisioning_failure_surfaces_and_aborts() {
    let executor = MockExecutor::new()
        .with_existing_table("Terms")
        .with_failure_on("DROP TABLE");
    let mut session = LoadSession::new(executor, options(Dialect::Postgres, true, false));

    let err = session
        .load_sheet(&sheet("Terms", two_rows()))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Provisioning(_)));

    // Nothing was inserted after the failed DDL.
    let executor = session.into_executor();
    assert!(executor.batches().is_empty());
}

// =============================================================================
// Input resolution over real files
// =============================================================================

fn write_zip(path: &Path, entries: &[&str]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let zip_options = zip::write::FileOptions::default();
    for entry in entries {
        writer.start_file(*entry, zip_options).unwrap();
        writer.write_all(b"stub").unwrap();
    }
    writer.finish().unwrap();
}

fn set_mtime(path: &Path, secs_ago: u64) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(secs_ago))
        .unwrap();
}

#[test]
fn base_path_resolution_prefers_the_newer_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("Export_CDGC");
    write_zip(&base.with_extension("zip"), &["a.xlsx"]);
    std::fs::write(base.with_extension("xlsx"), b"x").unwrap();

    set_mtime(&base.with_extension("zip"), 5);
    set_mtime(&base.with_extension("xlsx"), 500);
    let picked = find_input_file(base.to_str().unwrap()).unwrap();
    assert_eq!(picked.extension().unwrap(), "zip");

    set_mtime(&base.with_extension("zip"), 500);
    set_mtime(&base.with_extension("xlsx"), 5);
    let picked = find_input_file(base.to_str().unwrap()).unwrap();
    assert_eq!(picked.extension().unwrap(), "xlsx");
}

#[test]
fn zip_inputs_expand_to_their_spreadsheet_entries() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("export.zip");
    write_zip(
        &archive,
        &["nested/a.xlsx", "b.xls", "manifest.json", "readme.txt"],
    );

    let resolved = resolve_inputs(&archive).unwrap();
    let mut names: Vec<_> = resolved
        .files
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.xlsx", "b.xls"]);
}

#[test]
fn zip_without_spreadsheets_is_empty_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("export.zip");
    write_zip(&archive, &["only.csv"]);

    let resolved = resolve_inputs(&archive).unwrap();
    assert!(resolved.files.is_empty());
}
