#![cfg(feature = "excel_test_writer")]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use sheet_reconcile::compare::{DeltaOptions, SheetDiffOptions, StackedOptions};
use sheet_reconcile::execution::{ComparisonRequest, ComparisonRunner, ExecutionOptions};
use sheet_reconcile::export::xlsx::{workbook_to_buffer, write_workbook};
use sheet_reconcile::export::{sheets_for, ExportSheet};
use sheet_reconcile::ingestion::excel::{ingest_excel_from_bytes, ingest_excel_from_path, sheet_names_from_path};
use sheet_reconcile::ingestion::{load_table, IngestionOptions};
use sheet_reconcile::types::{Schema, Table, Value};
use sheet_reconcile::ReconcileError;

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("sheet-reconcile-export-{name}-{nanos}.xlsx"))
}

fn ledgers() -> (Table, Table) {
    let a = load_table("tests/fixtures/ledger_a.csv", &IngestionOptions::default()).unwrap();
    let b = load_table("tests/fixtures/ledger_b.csv", &IngestionOptions::default()).unwrap();
    (a, b)
}

#[test]
fn stacked_workbook_round_trips_through_the_loader() {
    let (a, b) = ledgers();
    let runner = ComparisonRunner::new(ExecutionOptions { num_threads: Some(1) }).unwrap();
    let request = ComparisonRequest::Stacked(StackedOptions {
        name_a: "Ledger".into(),
        name_b: "Bank: March".into(),
        ..StackedOptions::default()
    });
    let outcome = runner.run(&a, &b, &request).unwrap();

    let path = tmp_file("stacked");
    write_workbook(&path, &sheets_for(&outcome)).unwrap();

    assert_eq!(
        sheet_names_from_path(&path).unwrap(),
        ["Combined", "Ledger-only", "Bank_ March-only"]
    );

    let combined = ingest_excel_from_path(&path, Some("Combined")).unwrap();
    assert_eq!(
        combined.schema,
        Schema::new(["Source", "Control number", "Vendor", "Amount", "Posted", "PairStatus"])
    );
    assert_eq!(combined.row_count(), 8);
    assert_eq!(
        combined.rows[0],
        vec![
            Value::text("Ledger"),
            Value::text("C-002"),
            Value::text("Globex"),
            Value::Float64(200.0),
            Value::Null,
            Value::text("Paired"),
        ]
    );

    let only_b = ingest_excel_from_path(&path, Some("Bank_ March-only")).unwrap();
    assert_eq!(only_b.row_count(), 1);
    assert_eq!(only_b.rows[0][1], Value::text("C-005"));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn difference_workbook_in_memory() {
    let a = load_table("tests/fixtures/budget.csv", &IngestionOptions::default()).unwrap();
    let b = load_table("tests/fixtures/actuals.csv", &IngestionOptions::default()).unwrap();
    let runner = ComparisonRunner::new(ExecutionOptions::default()).unwrap();
    let outcome = runner
        .run(
            &a,
            &b,
            &ComparisonRequest::CalculationDifference(DeltaOptions {
                key_column: "Account".into(),
                value_column_a: "Budget".into(),
                value_column_b: "Actual".into(),
            }),
        )
        .unwrap();

    let bytes = workbook_to_buffer(&sheets_for(&outcome)).unwrap();
    let t = ingest_excel_from_bytes(&bytes, Some("Differences")).unwrap();

    assert_eq!(t.schema, Schema::new(["Account", "Budget", "Actual", "Difference"]));
    assert_eq!(t.rows[1][3], Value::Float64(-49.5));
    assert_eq!(t.rows[2][1], Value::Null);
}

#[test]
fn set_difference_sheets_are_named_for_each_direction() {
    let (a, b) = ledgers();
    let runner = ComparisonRunner::new(ExecutionOptions::default()).unwrap();
    let outcome = runner
        .run(
            &a,
            &b,
            &ComparisonRequest::SheetDifference(SheetDiffOptions::same_columns(["Vendor"])),
        )
        .unwrap();

    let bytes = workbook_to_buffer(&sheets_for(&outcome)).unwrap();
    let only_a = ingest_excel_from_bytes(&bytes, Some("In_A_Not_in_B")).unwrap();
    let only_b = ingest_excel_from_bytes(&bytes, Some("In_B_Not_in_A")).unwrap();

    assert_eq!(only_a.rows, vec![vec![Value::text("Acme")], vec![Value::text("Initech")]]);
    assert_eq!(only_b.rows, vec![vec![Value::text("Hooli")]]);
}

#[test]
fn plain_sheet_without_columns_is_written_blank() {
    let sheets = vec![
        ExportSheet::plain("Empty", Table::default()),
        ExportSheet::plain("One", Table::new(Schema::new(["x"]), vec![vec![Value::Bool(false)]])),
    ];
    let bytes = workbook_to_buffer(&sheets).unwrap();

    // No header row was written, so the loader has nothing to read.
    let err = ingest_excel_from_bytes(&bytes, Some("Empty")).unwrap_err();
    assert!(matches!(err, ReconcileError::SchemaMismatch { .. }));
    assert!(err.to_string().contains("sheet 'Empty': sheet has no non-empty rows"));

    let t = ingest_excel_from_bytes(&bytes, Some("One")).unwrap();
    assert_eq!(t.rows, vec![vec![Value::Bool(false)]]);
}
