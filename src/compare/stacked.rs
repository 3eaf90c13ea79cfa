//! Stacked comparison: both tables in one sheet, paired by a control column.
//!
//! Every row from A and B lands in a single combined table tagged with its `Source` and a
//! `PairStatus`. Rows are grouped so that the A and B rows sharing a key sit next to each
//! other, and a [`HighlightPlan`] tells an exporter which rows to fill.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, ReconcileResult};
use crate::normalize::{normalize_key, resolve_column_ignore_case};
use crate::types::{Schema, Side, Table, Value};

use super::ensure_shape;

/// Name of the derived provenance column.
pub const SOURCE_COLUMN: &str = "Source";
/// Name of the derived classification column.
pub const PAIR_STATUS_COLUMN: &str = "PairStatus";
/// Label for rows whose key appears in both tables.
pub const PAIRED_LABEL: &str = "Paired";

/// Fill for B-sourced rows (`#FFF4B3`).
pub const FILL_SOURCE_B: u32 = 0xFFF4B3;
/// Fill for A-sourced rows that are paired (`#CFE2F3`).
pub const FILL_PAIRED_A: u32 = 0xCFE2F3;

/// Parameters for [`stacked_compare`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackedOptions {
    /// Display name for table A, written into `Source` and used in labels.
    pub name_a: String,
    /// Display name for table B.
    pub name_b: String,
    /// Control column, matched case- and whitespace-insensitively in each table.
    pub control_column: String,
}

impl Default for StackedOptions {
    fn default() -> Self {
        Self {
            name_a: "File A".to_string(),
            name_b: "File B".to_string(),
            control_column: "Control number".to_string(),
        }
    }
}

impl StackedOptions {
    fn name(&self, side: Side) -> &str {
        match side {
            Side::A => &self.name_a,
            Side::B => &self.name_b,
        }
    }
}

/// Classification of a combined row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PairStatus {
    /// Key present in both tables.
    Paired,
    /// A-sourced row whose key only exists in A.
    OnlyA,
    /// B-sourced row whose key only exists in B.
    OnlyB,
    /// Row without a usable key.
    Unclassified,
}

impl PairStatus {
    /// Label written into the `PairStatus` column.
    pub fn label(self, options: &StackedOptions) -> String {
        match self {
            Self::Paired => PAIRED_LABEL.to_string(),
            Self::OnlyA => format!("{}-only", options.name_a),
            Self::OnlyB => format!("{}-only", options.name_b),
            Self::Unclassified => String::new(),
        }
    }

    fn block(self) -> u8 {
        match self {
            Self::Paired => 0,
            Self::OnlyA => 1,
            Self::OnlyB | Self::Unclassified => 2,
        }
    }
}

/// Per-row highlight instruction for the combined table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RowHighlight {
    #[default]
    None,
    /// A-sourced paired row.
    ColorA,
    /// Any B-sourced row.
    ColorB,
}

impl RowHighlight {
    /// Solid fill colour as `0xRRGGBB`, or `None` for an unhighlighted row.
    pub fn fill_rgb(self) -> Option<u32> {
        match self {
            Self::None => None,
            Self::ColorA => Some(FILL_PAIRED_A),
            Self::ColorB => Some(FILL_SOURCE_B),
        }
    }

    fn for_row(source: Side, status: PairStatus) -> Self {
        match (source, status) {
            (Side::B, _) => Self::ColorB,
            (Side::A, PairStatus::Paired) => Self::ColorA,
            (Side::A, _) => Self::None,
        }
    }
}

/// Highlight for every row of a combined table, indexed by row position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct HighlightPlan {
    rows: Vec<RowHighlight>,
}

impl HighlightPlan {
    /// Build a plan from already-classified rows.
    pub fn from_rows(rows: &[StackedRow]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|r| RowHighlight::for_row(r.source, r.status))
                .collect(),
        }
    }

    /// Highlight for data row `idx` (0-based, header excluded).
    pub fn get(&self, idx: usize) -> RowHighlight {
        self.rows.get(idx).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate `(row_index, highlight)` for rows that get a fill.
    pub fn highlighted(&self) -> impl Iterator<Item = (usize, RowHighlight)> + '_ {
        self.rows
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, h)| *h != RowHighlight::None)
    }
}

/// Metadata for one row of the combined table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackedRow {
    pub source: Side,
    /// Position of the row in its input table.
    pub input_row: usize,
    /// Normalized control value; `None` when the cell was blank.
    pub key: Option<String>,
    pub status: PairStatus,
}

/// Counts reported by [`stacked_compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StackedSummary {
    pub total_a: usize,
    pub total_b: usize,
    /// Distinct keys present in both tables.
    pub paired: usize,
    /// Distinct keys present only in A.
    pub only_a: usize,
    /// Distinct keys present only in B.
    pub only_b: usize,
}

impl fmt::Display for StackedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total_a={}, total_b={}, paired_keys={}, only_a_keys={}, only_b_keys={}",
            self.total_a, self.total_b, self.paired, self.only_a, self.only_b
        )
    }
}

/// Result of [`stacked_compare`].
#[derive(Debug, Clone, PartialEq)]
pub struct StackedOutcome {
    /// All rows of both tables, grouped and ordered, with `Source` and `PairStatus`.
    pub combined: Table,
    /// Per-row metadata, aligned with `combined.rows`.
    pub rows: Vec<StackedRow>,
    /// A rows whose key only exists in A, in input order (no `PairStatus` column).
    pub a_only: Table,
    /// B rows whose key only exists in B, in input order (no `PairStatus` column).
    pub b_only: Table,
    pub summary: StackedSummary,
    pub highlight_plan: HighlightPlan,
    /// Options the outcome was computed with (names are needed to label exports).
    pub options: StackedOptions,
}

/// Stack `a` and `b` on a control column and classify every row.
///
/// Output column order is `Source`, the control column (canonical spelling), A's remaining
/// columns, B's remaining columns not already present, then `PairStatus`. Input columns named
/// `Source` or `PairStatus` are replaced by the derived ones.
///
/// Row order: paired rows, then A-only, then everything else (B-only and blank-key rows); within
/// a block by key, A before B, then input order. A blank key sorts as `""`.
///
/// # Errors
///
/// - [`ReconcileError::Configuration`] if the control column name is blank or collides with a
///   derived column
/// - [`ReconcileError::Lookup`] if the control column is missing from either table
/// - [`ReconcileError::SchemaMismatch`] if either table has ragged rows
pub fn stacked_compare(a: &Table, b: &Table, options: &StackedOptions) -> ReconcileResult<StackedOutcome> {
    let control = options.control_column.trim();
    if control.is_empty() {
        return Err(ReconcileError::configuration("control column name is empty"));
    }
    if is_derived(control) {
        return Err(ReconcileError::configuration(format!(
            "control column '{control}' collides with a derived column"
        )));
    }

    ensure_shape(a, Side::A)?;
    ensure_shape(b, Side::B)?;

    let ctrl_a = resolve_column_ignore_case(&a.schema, &options.control_column, Side::A)?;
    let ctrl_b = resolve_column_ignore_case(&b.schema, &options.control_column, Side::B)?;

    let names_a = renamed(&a.schema, ctrl_a, control);
    let names_b = renamed(&b.schema, ctrl_b, control);
    let union = union_columns(control, &names_a, &names_b);
    let layout_a = SideLayout::new(&union, &names_a);
    let layout_b = SideLayout::new(&union, &names_b);

    let keys_a: Vec<Option<String>> = a.rows.iter().map(|r| normalize_key(&r[ctrl_a])).collect();
    let keys_b: Vec<Option<String>> = b.rows.iter().map(|r| normalize_key(&r[ctrl_b])).collect();
    let set_a: HashSet<&str> = keys_a.iter().flatten().map(String::as_str).collect();
    let set_b: HashSet<&str> = keys_b.iter().flatten().map(String::as_str).collect();

    let classify = |source: Side, key: &Option<String>| -> PairStatus {
        let Some(k) = key.as_deref() else {
            return PairStatus::Unclassified;
        };
        match (source, set_a.contains(k), set_b.contains(k)) {
            (_, true, true) => PairStatus::Paired,
            (Side::A, true, false) => PairStatus::OnlyA,
            (Side::B, false, true) => PairStatus::OnlyB,
            _ => PairStatus::Unclassified,
        }
    };

    let mut rows: Vec<StackedRow> = Vec::with_capacity(a.row_count() + b.row_count());
    for (side, keys) in [(Side::A, &keys_a), (Side::B, &keys_b)] {
        for (input_row, key) in keys.iter().enumerate() {
            rows.push(StackedRow {
                source: side,
                input_row,
                key: key.clone(),
                status: classify(side, key),
            });
        }
    }

    // Stable: ties keep A rows ahead of B rows and input order within a side.
    rows.sort_by(|x, y| {
        x.status
            .block()
            .cmp(&y.status.block())
            .then_with(|| x.key.as_deref().unwrap_or("").cmp(y.key.as_deref().unwrap_or("")))
            .then_with(|| x.source.cmp(&y.source))
    });

    let build = |meta: &StackedRow, with_status: bool| -> Vec<Value> {
        let (table, layout) = match meta.source {
            Side::A => (a, &layout_a),
            Side::B => (b, &layout_b),
        };
        let mut out = layout.project(
            &table.rows[meta.input_row],
            options.name(meta.source),
            meta.key.as_deref(),
        );
        if with_status {
            out.push(Value::Utf8(meta.status.label(options)));
        }
        out
    };

    let combined_rows: Vec<Vec<Value>> = rows.iter().map(|m| build(m, true)).collect();

    let side_rows = |status: PairStatus| -> Vec<Vec<Value>> {
        let mut selected: Vec<&StackedRow> = rows.iter().filter(|m| m.status == status).collect();
        selected.sort_by_key(|m| m.input_row);
        selected.into_iter().map(|m| build(m, false)).collect()
    };
    let a_only_rows = side_rows(PairStatus::OnlyA);
    let b_only_rows = side_rows(PairStatus::OnlyB);

    let summary = StackedSummary {
        total_a: a.row_count(),
        total_b: b.row_count(),
        paired: set_a.intersection(&set_b).count(),
        only_a: set_a.difference(&set_b).count(),
        only_b: set_b.difference(&set_a).count(),
    };

    let side_schema = Schema::new(union.iter().cloned());
    let mut combined_schema = side_schema.clone();
    combined_schema.columns.push(PAIR_STATUS_COLUMN.to_string());

    let highlight_plan = HighlightPlan::from_rows(&rows);

    Ok(StackedOutcome {
        combined: Table::new(combined_schema, combined_rows),
        rows,
        a_only: Table::new(side_schema.clone(), a_only_rows),
        b_only: Table::new(side_schema, b_only_rows),
        summary,
        highlight_plan,
        options: options.clone(),
    })
}

fn is_derived(name: &str) -> bool {
    name.eq_ignore_ascii_case(SOURCE_COLUMN) || name.eq_ignore_ascii_case(PAIR_STATUS_COLUMN)
}

/// Column names of `schema` with the control column renamed to its canonical spelling.
fn renamed(schema: &Schema, ctrl: usize, control: &str) -> Vec<String> {
    let mut names = schema.columns.clone();
    names[ctrl] = control.to_string();
    names
}

/// `Source`, control, then A's and B's other columns; first occurrence of a name wins.
/// `PairStatus` is appended by the caller.
fn union_columns(control: &str, names_a: &[String], names_b: &[String]) -> Vec<String> {
    let mut out: Vec<String> = vec![SOURCE_COLUMN.to_string(), control.to_string()];
    for name in names_a.iter().chain(names_b) {
        if name == SOURCE_COLUMN || name == PAIR_STATUS_COLUMN {
            continue;
        }
        if !out.iter().any(|c| c == name) {
            out.push(name.clone());
        }
    }
    out
}

/// Where each union column comes from in one side's rows.
struct SideLayout {
    slots: Vec<Slot>,
}

enum Slot {
    Source,
    Key,
    Column(usize),
    Absent,
}

impl SideLayout {
    fn new(union: &[String], names: &[String]) -> Self {
        let slots = union
            .iter()
            .enumerate()
            .map(|(j, name)| match j {
                0 => Slot::Source,
                1 => Slot::Key,
                _ => names
                    .iter()
                    .position(|n| n == name)
                    .map_or(Slot::Absent, Slot::Column),
            })
            .collect();
        Self { slots }
    }

    fn project(&self, row: &[Value], source_name: &str, key: Option<&str>) -> Vec<Value> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Source => Value::text(source_name),
                Slot::Key => key.map_or(Value::Null, Value::text),
                Slot::Column(i) => row[*i].clone(),
                Slot::Absent => Value::Null,
            })
            .collect()
    }
}
