//! Comparison engines.
//!
//! Each engine is a pure function of two [`crate::types::Table`]s plus options. None performs
//! I/O, and none mutates its inputs; every result table is newly built.
//!
//! - [`diff_sheets()`]: set difference of selected column projections
//! - [`stacked_compare()`]: union on a control column with pair classification and highlights
//! - [`calc_difference()`]: inner join on a key with a per-row numeric difference
//!
//! ## Example: stacked comparison
//!
//! ```rust
//! use sheet_reconcile::compare::{stacked_compare, PairStatus, StackedOptions};
//! use sheet_reconcile::types::{Schema, Table, Value};
//!
//! let a = Table::new(
//!     Schema::new(["Control Number", "Amount"]),
//!     vec![
//!         vec![Value::text("C-1"), Value::Int64(10)],
//!         vec![Value::text("C-2"), Value::Int64(20)],
//!     ],
//! );
//! let b = Table::new(
//!     Schema::new(["control number", "Amount"]),
//!     vec![vec![Value::text("C-2 "), Value::Int64(25)]],
//! );
//!
//! let out = stacked_compare(&a, &b, &StackedOptions::default()).unwrap();
//! assert_eq!(out.summary.paired, 1);
//! assert_eq!(out.rows[0].status, PairStatus::Paired);
//! assert_eq!(out.combined.rows[2][3], Value::text("File A-only"));
//! ```

pub mod delta;
pub mod sheet_diff;
pub mod stacked;

pub use delta::{calc_difference, DeltaOptions, DeltaOutcome, DeltaSummary, DIFFERENCE_COLUMN};
pub use sheet_diff::{diff_sheets, SheetDiffOptions, SheetDiffOutcome, SheetDiffSummary};
pub use stacked::{
    stacked_compare, HighlightPlan, PairStatus, RowHighlight, StackedOptions, StackedOutcome, StackedRow,
    StackedSummary, PAIR_STATUS_COLUMN, SOURCE_COLUMN,
};

use crate::error::{ReconcileError, ReconcileResult};
use crate::types::{Side, Table};

fn ensure_shape(table: &Table, side: Side) -> ReconcileResult<()> {
    table
        .check_shape()
        .map_err(|message| ReconcileError::SchemaMismatch {
            message: format!("table {side}: {message}"),
        })
}
