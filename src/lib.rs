//! `sheet-reconcile` compares two spreadsheet tables and reports how they differ.
//!
//! Tables are loaded into an in-memory [`types::Table`] (ordered column names plus rows of
//! [`types::Value`] cells), handed to one of three comparison engines, and the results can be
//! exported back to CSV or a workbook.
//!
//! ## Comparison engines
//!
//! - [`compare::diff_sheets`]: which rows of a column projection appear in one table but not the
//!   other (after per-side deduplication and trim normalization)
//! - [`compare::stacked_compare`]: union of both tables on a control column, every row tagged with
//!   its source and pair status, plus a per-row highlight plan
//! - [`compare::calc_difference`]: inner join on a key column with `A - B` per joined row
//!
//! The engines are pure: no I/O, no shared state, inputs are never mutated.
//!
//! ## Quick example: set difference
//!
//! ```rust
//! use sheet_reconcile::compare::{diff_sheets, SheetDiffOptions};
//! use sheet_reconcile::types::{Schema, Table, Value};
//!
//! let a = Table::new(
//!     Schema::new(["ID"]),
//!     vec![vec![Value::text("1")], vec![Value::text("2")], vec![Value::text("2")]],
//! );
//! let b = Table::new(
//!     Schema::new(["ID"]),
//!     vec![vec![Value::text(" 2 ")], vec![Value::text("3")]],
//! );
//!
//! let out = diff_sheets(&a, &b, &SheetDiffOptions::same_columns(["ID"])).unwrap();
//! assert_eq!(out.only_in_a.rows, vec![vec![Value::text("1")]]);
//! assert_eq!(out.only_in_b.rows, vec![vec![Value::text("3")]]);
//! assert_eq!(out.summary.matched, 1);
//! ```
//!
//! ## Loading and exporting
//!
//! ```no_run
//! use sheet_reconcile::compare::DeltaOptions;
//! use sheet_reconcile::execution::{ComparisonRequest, ComparisonRunner, ExecutionOptions};
//! use sheet_reconcile::export::{csv::write_table_csv_to_path, sheets_for};
//! use sheet_reconcile::ingestion::{load_table, IngestionOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let a = load_table("budget.csv", &IngestionOptions::default())?;
//! let b = load_table("actuals.csv", &IngestionOptions::default())?;
//!
//! let runner = ComparisonRunner::new(ExecutionOptions::default())?;
//! let request = ComparisonRequest::CalculationDifference(DeltaOptions {
//!     key_column: "Account".into(),
//!     value_column_a: "Amount".into(),
//!     value_column_b: "Amount".into(),
//! });
//! let outcome = runner.run(&a, &b, &request)?;
//! println!("{}", outcome.summary_line());
//!
//! for sheet in sheets_for(&outcome) {
//!     write_table_csv_to_path(format!("{}.csv", sheet.name), &sheet.table)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: table, schema and cell types
//! - [`normalize`]: cell/key normalization and column resolution shared by the engines
//! - [`compare`]: the three comparison engines
//! - [`ingestion`]: CSV and workbook loading (workbooks require the Cargo feature `excel`)
//! - [`export`]: CSV and workbook writers (workbooks require the Cargo feature `xlsx_export`)
//! - [`execution`]: request dispatch, parallel batches, metrics and observer hooks
//! - [`error`]: error types

pub mod compare;
pub mod error;
pub mod execution;
pub mod export;
pub mod ingestion;
pub mod normalize;
pub mod types;

pub use error::{DeltaError, DeltaStage, ReconcileError, ReconcileResult, RunError};
