//! Writing comparison results out: the boundary where result tables become files.
//!
//! [`sheets_for`] turns a [`ComparisonOutcome`] into named [`ExportSheet`]s; the writers decide
//! the format:
//!
//! - [`csv`]: one table per CSV stream
//! - `xlsx` (feature `xlsx_export`): one workbook, one worksheet per sheet, with highlight fills

pub mod csv;
#[cfg(feature = "xlsx_export")]
pub mod xlsx;

use std::collections::HashSet;

use crate::compare::HighlightPlan;
use crate::execution::ComparisonOutcome;
use crate::types::Table;

/// Longest worksheet name Excel accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// One named result table ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSheet {
    /// Worksheet name (already sanitized when built by [`sheets_for`]).
    pub name: String,
    pub table: Table,
    /// Per-row fills; `None` writes every row plain.
    pub highlights: Option<HighlightPlan>,
    /// Freeze the header row and put an autofilter over the data.
    pub freeze_header: bool,
}

impl ExportSheet {
    /// A plain sheet: no fills, no frozen header.
    pub fn plain(name: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            table,
            highlights: None,
            freeze_header: false,
        }
    }
}

/// Result sheets for an outcome, in workbook order.
///
/// - set difference: `In_A_Not_in_B`, `In_B_Not_in_A`
/// - stacked: `Combined` (highlighted, frozen header), `<nameA>-only`, `<nameB>-only`
/// - numeric delta: `Differences`
///
/// Names are passed through [`sanitize_sheet_name`] and made unique within the workbook.
pub fn sheets_for(outcome: &ComparisonOutcome) -> Vec<ExportSheet> {
    let sheets = match outcome {
        ComparisonOutcome::SheetDifference(o) => vec![
            ExportSheet::plain("In_A_Not_in_B", o.only_in_a.clone()),
            ExportSheet::plain("In_B_Not_in_A", o.only_in_b.clone()),
        ],
        ComparisonOutcome::Stacked(o) => vec![
            ExportSheet {
                name: "Combined".to_string(),
                table: o.combined.clone(),
                highlights: Some(o.highlight_plan.clone()),
                freeze_header: true,
            },
            ExportSheet::plain(format!("{}-only", o.options.name_a), o.a_only.clone()),
            ExportSheet::plain(format!("{}-only", o.options.name_b), o.b_only.clone()),
        ],
        ComparisonOutcome::CalculationDifference(o) => {
            vec![ExportSheet::plain("Differences", o.merged.clone())]
        }
    };

    let mut used = HashSet::new();
    sheets
        .into_iter()
        .map(|mut sheet| {
            sheet.name = unique_sheet_name(&sanitize_sheet_name(&sheet.name), &mut used);
            sheet
        })
        .collect()
}

/// Make `name` acceptable as a worksheet name.
///
/// Forbidden characters (`[ ] : * ? / \`) become `_`, leading/trailing apostrophes and
/// whitespace are dropped, the result is cut to 31 characters, and an empty result becomes
/// `Sheet`.
pub fn sanitize_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim().trim_matches('\'').trim();
    let cut: String = trimmed.chars().take(MAX_SHEET_NAME_LEN).collect();
    if cut.is_empty() {
        "Sheet".to_string()
    } else {
        cut
    }
}

// Excel compares sheet names case-insensitively.
fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_lowercase()) {
        return name.to_string();
    }
    let mut n = 2usize;
    loop {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
        let candidate = format!("{}{suffix}", name.chars().take(keep).collect::<String>());
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize_sheet_name, sheets_for, unique_sheet_name};
    use std::collections::HashSet;

    use crate::compare::{stacked_compare, StackedOptions};
    use crate::execution::ComparisonOutcome;
    use crate::types::{Schema, Table, Value};

    #[test]
    fn sanitize_replaces_forbidden_chars_and_truncates() {
        assert_eq!(sanitize_sheet_name("Q1/Q2 [draft]"), "Q1_Q2 _draft_");
        assert_eq!(sanitize_sheet_name("  'x'  "), "x");
        assert_eq!(sanitize_sheet_name("???").len(), 3);
        assert_eq!(sanitize_sheet_name(""), "Sheet");
        let long = "a".repeat(40);
        assert_eq!(sanitize_sheet_name(&long).chars().count(), 31);
    }

    #[test]
    fn unique_names_ignore_case() {
        let mut used = HashSet::new();
        assert_eq!(unique_sheet_name("Ledger-only", &mut used), "Ledger-only");
        assert_eq!(unique_sheet_name("ledger-only", &mut used), "ledger-only (2)");
        let long = "b".repeat(31);
        assert_eq!(unique_sheet_name(&long, &mut used), long);
        let second = unique_sheet_name(&long, &mut used);
        assert_eq!(second.chars().count(), 31);
        assert!(second.ends_with(" (2)"));
    }

    #[test]
    fn stacked_outcome_yields_three_sheets() {
        let t = Table::new(
            Schema::new(["Control number"]),
            vec![vec![Value::text("1")]],
        );
        let options = StackedOptions {
            name_a: "Same".into(),
            name_b: "same".into(),
            ..StackedOptions::default()
        };
        let outcome = ComparisonOutcome::Stacked(stacked_compare(&t, &t, &options).unwrap());

        let sheets = sheets_for(&outcome);
        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Combined", "Same-only", "same-only (2)"]);
        assert!(sheets[0].freeze_header);
        assert_eq!(sheets[0].highlights.as_ref().map(|h| h.len()), Some(2));
        assert!(sheets[1].highlights.is_none());
    }
}
