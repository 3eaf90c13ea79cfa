#![cfg(feature = "excel")]

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};

use crate::error::{ReconcileError, ReconcileResult};
use crate::types::{Schema, Table, Value};

/// Sheet names of a workbook (`.xlsx`, `.xls`, `.ods`, etc.), in workbook order.
pub fn sheet_names_from_path(path: impl AsRef<Path>) -> ReconcileResult<Vec<String>> {
    let workbook = open_workbook_auto(path)?;
    Ok(workbook.sheet_names().to_vec())
}

/// Load one sheet of an Excel document into a [`Table`].
///
/// Behavior:
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row; blank headers become `Unnamed: <idx>`
/// - Keeps raw cell types (numbers stay numbers, text stays text); empty cells become nulls
/// - Skips rows with no non-empty cell
pub fn ingest_excel_from_path(path: impl AsRef<Path>, sheet_name: Option<&str>) -> ReconcileResult<Table> {
    let mut workbook = open_workbook_auto(path)?;
    read_sheet(&mut workbook, sheet_name)
}

/// Same as [`ingest_excel_from_path`], for a workbook already held in memory (e.g. an upload).
pub fn ingest_excel_from_bytes(bytes: &[u8], sheet_name: Option<&str>) -> ReconcileResult<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    read_sheet(&mut workbook, sheet_name)
}

fn read_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>, sheet_name: Option<&str>) -> ReconcileResult<Table> {
    let names = workbook.sheet_names().to_vec();
    let sheet = match sheet_name {
        Some(name) if names.iter().any(|n| n == name) => name.to_string(),
        Some(name) => {
            return Err(ReconcileError::SchemaMismatch {
                message: format!("sheet '{name}' not found. sheets={names:?}"),
            });
        }
        None => names.first().cloned().ok_or_else(|| ReconcileError::SchemaMismatch {
            message: "workbook has no sheets".to_string(),
        })?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    range_to_table(&range).map_err(|e| wrap_schema_err_with_sheet(&sheet, e))
}

fn range_to_table(range: &calamine::Range<Data>) -> ReconcileResult<Table> {
    let mut rows_iter = range
        .rows()
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)));

    let header = rows_iter.next().ok_or_else(|| ReconcileError::SchemaMismatch {
        message: "sheet has no non-empty rows (no header row found)".to_string(),
    })?;
    let schema = Schema::new(header.iter().enumerate().map(|(idx, c)| {
        let name = cell_to_header_string(c);
        if name.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            name
        }
    }));

    let rows = rows_iter
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    Ok(Table::new(schema, rows))
}

fn wrap_schema_err_with_sheet(sheet: &str, err: ReconcileError) -> ReconcileError {
    match err {
        ReconcileError::SchemaMismatch { message } => ReconcileError::SchemaMismatch {
            message: format!("sheet '{sheet}': {message}"),
        },
        other => other,
    }
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Float(f) => Value::Float64(*f).to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::Utf8(s.clone()),
        other => Value::Utf8(other.to_string()),
    }
}
