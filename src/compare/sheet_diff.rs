//! Set-difference comparison: rows of one projection missing from the other.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, ReconcileResult};
use crate::normalize::{normalize_cell, resolve_column};
use crate::types::{CellIdentity, Schema, Side, Table, Value};

use super::ensure_shape;

/// Columns to compare. Correspondence is by position: `columns_a[i]` pairs with `columns_b[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SheetDiffOptions {
    /// Ordered column names selected from table A.
    pub columns_a: Vec<String>,
    /// Ordered column names selected from table B.
    pub columns_b: Vec<String>,
}

impl SheetDiffOptions {
    /// Select the same column names on both sides.
    pub fn same_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        Self {
            columns_a: columns.clone(),
            columns_b: columns,
        }
    }
}

/// Counts reported by [`diff_sheets`]. Totals are after per-side deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SheetDiffSummary {
    pub total_a: usize,
    pub total_b: usize,
    /// Distinct normalized rows present on both sides.
    pub matched: usize,
    pub only_in_a: usize,
    pub only_in_b: usize,
}

impl fmt::Display for SheetDiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total_a={}, total_b={}, matched={}, only_in_a={}, only_in_b={}",
            self.total_a, self.total_b, self.matched, self.only_in_a, self.only_in_b
        )
    }
}

/// Result of [`diff_sheets`].
///
/// Both tables use A's selected column names and hold normalized text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetDiffOutcome {
    pub only_in_a: Table,
    pub only_in_b: Table,
    pub summary: SheetDiffSummary,
}

/// Compare the selected columns of `a` and `b` as sets of rows.
///
/// Steps:
/// - project each side to its selected columns (B takes A's names positionally)
/// - drop exact-duplicate rows within each side
/// - normalize every cell to its trimmed string form
/// - report rows with no equal row on the other side
///
/// Rows in each output keep their input order.
///
/// # Errors
///
/// - [`ReconcileError::Configuration`] if the selections differ in length or are empty
/// - [`ReconcileError::Lookup`] if a selected column does not exist
/// - [`ReconcileError::SchemaMismatch`] if either table has ragged rows
pub fn diff_sheets(a: &Table, b: &Table, options: &SheetDiffOptions) -> ReconcileResult<SheetDiffOutcome> {
    if options.columns_a.len() != options.columns_b.len() {
        return Err(ReconcileError::configuration(format!(
            "select the same number of columns in both sheets (A has {}, B has {})",
            options.columns_a.len(),
            options.columns_b.len()
        )));
    }
    if options.columns_a.is_empty() {
        return Err(ReconcileError::configuration(
            "select at least one column to compare",
        ));
    }

    ensure_shape(a, Side::A)?;
    ensure_shape(b, Side::B)?;

    let idx_a = resolve_all(&a.schema, &options.columns_a, Side::A)?;
    let idx_b = resolve_all(&b.schema, &options.columns_b, Side::B)?;

    let rows_a = project_distinct(a, &idx_a);
    let rows_b = project_distinct(b, &idx_b);

    let set_a: HashSet<&[String]> = rows_a.iter().map(Vec::as_slice).collect();
    let set_b: HashSet<&[String]> = rows_b.iter().map(Vec::as_slice).collect();

    let only_a: Vec<Vec<Value>> = rows_a
        .iter()
        .filter(|r| !set_b.contains(r.as_slice()))
        .map(|r| to_text_row(r))
        .collect();
    let only_b: Vec<Vec<Value>> = rows_b
        .iter()
        .filter(|r| !set_a.contains(r.as_slice()))
        .map(|r| to_text_row(r))
        .collect();

    let summary = SheetDiffSummary {
        total_a: rows_a.len(),
        total_b: rows_b.len(),
        matched: set_a.intersection(&set_b).count(),
        only_in_a: only_a.len(),
        only_in_b: only_b.len(),
    };

    let schema = Schema::new(options.columns_a.iter().cloned());
    Ok(SheetDiffOutcome {
        only_in_a: Table::new(schema.clone(), only_a),
        only_in_b: Table::new(schema, only_b),
        summary,
    })
}

fn resolve_all(schema: &Schema, names: &[String], side: Side) -> ReconcileResult<Vec<usize>> {
    names
        .iter()
        .map(|name| resolve_column(schema, name, side))
        .collect()
}

/// Project to `idxs`, keep the first of each exact-duplicate row, then normalize.
///
/// Deduplication looks at raw cells, so `5` and `"5"` survive as two rows that normalize to the
/// same text; both then match (or miss) together.
fn project_distinct(table: &Table, idxs: &[usize]) -> Vec<Vec<String>> {
    let mut seen: HashSet<Vec<CellIdentity>> = HashSet::with_capacity(table.row_count());
    let mut out = Vec::with_capacity(table.row_count());
    for row in &table.rows {
        let identity: Vec<CellIdentity> = idxs.iter().map(|&i| row[i].identity()).collect();
        if seen.insert(identity) {
            out.push(idxs.iter().map(|&i| normalize_cell(&row[i])).collect());
        }
    }
    out
}

fn to_text_row(row: &[String]) -> Vec<Value> {
    row.iter().map(|s| Value::Utf8(s.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::{diff_sheets, SheetDiffOptions};
    use crate::error::ReconcileError;
    use crate::types::{Schema, Side, Table, Value};

    fn one_col(name: &str, values: &[Value]) -> Table {
        Table::new(
            Schema::new([name]),
            values.iter().map(|v| vec![v.clone()]).collect(),
        )
    }

    #[test]
    fn dedups_each_side_before_comparing() {
        let a = one_col("C1", &[Value::text("a"), Value::text("b")]);
        let b = one_col("C1", &[Value::text("b"), Value::text("b")]);

        let out = diff_sheets(&a, &b, &SheetDiffOptions::same_columns(["C1"])).unwrap();

        assert_eq!(out.only_in_a.rows, vec![vec![Value::text("a")]]);
        assert!(out.only_in_b.is_empty());
        assert_eq!(out.summary.total_a, 2);
        assert_eq!(out.summary.total_b, 1);
        assert_eq!(out.summary.matched, 1);
        assert_eq!(out.summary.only_in_a, 1);
        assert_eq!(out.summary.only_in_b, 0);
    }

    #[test]
    fn comparison_is_type_insensitive_after_trimming() {
        let a = one_col("n", &[Value::Int64(5), Value::Float64(2.5)]);
        let b = one_col("n", &[Value::text("5 "), Value::text("2.50")]);

        let out = diff_sheets(&a, &b, &SheetDiffOptions::same_columns(["n"])).unwrap();

        // "2.5" vs "2.50" differ textually.
        assert_eq!(out.only_in_a.rows, vec![vec![Value::text("2.5")]]);
        assert_eq!(out.only_in_b.rows, vec![vec![Value::text("2.50")]]);
        assert_eq!(out.summary.matched, 1);
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let a = one_col("n", &[Value::text("abc")]);
        let b = one_col("n", &[Value::text("ABC")]);
        let out = diff_sheets(&a, &b, &SheetDiffOptions::same_columns(["n"])).unwrap();
        assert_eq!(out.summary.only_in_a, 1);
        assert_eq!(out.summary.only_in_b, 1);
    }

    #[test]
    fn raw_distinct_rows_that_normalize_equal_both_count() {
        let a = one_col("n", &[Value::Int64(5), Value::text("5")]);
        let b = one_col("n", &[Value::text("5")]);

        let out = diff_sheets(&a, &b, &SheetDiffOptions::same_columns(["n"])).unwrap();
        assert_eq!(out.summary.total_a, 2);
        assert_eq!(out.summary.matched, 1);
        assert!(out.only_in_a.is_empty());
        assert!(out.only_in_b.is_empty());
        // Both raw rows collapse into one matched normalized row.
        assert_eq!(out.summary.matched + out.summary.only_in_a, 1);
    }

    #[test]
    fn matched_plus_only_equals_totals_without_normalization_collisions() {
        let a = one_col("n", &[Value::Int64(1), Value::text("2"), Value::text("3"), Value::Int64(1)]);
        let b = one_col("n", &[Value::text("2 "), Value::Float64(3.0), Value::text("4")]);

        let out = diff_sheets(&a, &b, &SheetDiffOptions::same_columns(["n"])).unwrap();
        let s = &out.summary;
        assert_eq!((s.total_a, s.total_b, s.matched), (3, 3, 2));
        assert_eq!(s.matched + s.only_in_a, s.total_a);
        assert_eq!(s.matched + s.only_in_b, s.total_b);
    }

    #[test]
    fn columns_correspond_by_position_and_take_a_names() {
        let a = Table::new(
            Schema::new(["Id", "Name", "Extra"]),
            vec![
                vec![Value::Int64(1), Value::text("x"), Value::Null],
                vec![Value::Int64(2), Value::text("y"), Value::Null],
            ],
        );
        let b = Table::new(
            Schema::new(["label", "ident"]),
            vec![
                vec![Value::text("x"), Value::text("1")],
                vec![Value::text("z"), Value::text("3")],
            ],
        );
        let opts = SheetDiffOptions {
            columns_a: vec!["Id".into(), "Name".into()],
            columns_b: vec!["ident".into(), "label".into()],
        };

        let out = diff_sheets(&a, &b, &opts).unwrap();
        assert_eq!(out.only_in_a.schema, Schema::new(["Id", "Name"]));
        assert_eq!(out.only_in_b.schema, Schema::new(["Id", "Name"]));
        assert_eq!(out.only_in_a.rows, vec![vec![Value::text("2"), Value::text("y")]]);
        assert_eq!(out.only_in_b.rows, vec![vec![Value::text("3"), Value::text("z")]]);
    }

    #[test]
    fn empty_side_reports_everything_as_only_in_other() {
        let a = one_col("c", &[Value::text("a"), Value::text("a"), Value::text("b")]);
        let b = one_col("c", &[]);

        let out = diff_sheets(&a, &b, &SheetDiffOptions::same_columns(["c"])).unwrap();
        assert_eq!(out.only_in_a.row_count(), 2);
        assert!(out.only_in_b.is_empty());
        assert_eq!(out.summary.matched, 0);
    }

    #[test]
    fn mismatched_selection_lengths_are_configuration_errors() {
        let a = one_col("c", &[Value::text("a")]);
        let opts = SheetDiffOptions {
            columns_a: vec!["c".into()],
            columns_b: vec![],
        };
        let err = diff_sheets(&a, &a, &opts).unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration { .. }));
        assert!(err.to_string().contains("same number of columns"));

        let err = diff_sheets(&a, &a, &SheetDiffOptions::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration { .. }));
    }

    #[test]
    fn unknown_column_is_lookup_error_with_side() {
        let a = one_col("c", &[Value::text("a")]);
        let b = one_col("d", &[Value::text("a")]);
        let err = diff_sheets(&a, &b, &SheetDiffOptions::same_columns(["c"])).unwrap_err();
        match err {
            ReconcileError::Lookup { column, side } => {
                assert_eq!(column, "c");
                assert_eq!(side, Side::B);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn inputs_are_not_mutated() {
        let a = one_col("c", &[Value::text(" a ")]);
        let b = one_col("c", &[Value::Int64(1)]);
        let (a0, b0) = (a.clone(), b.clone());
        let _ = diff_sheets(&a, &b, &SheetDiffOptions::same_columns(["c"])).unwrap();
        assert_eq!(a, a0);
        assert_eq!(b, b0);
    }
}
