//! CSV loading.

use std::path::Path;

use crate::error::ReconcileResult;
use crate::types::{Schema, Table, Value};

/// Load a headered CSV file into a [`Table`].
///
/// Rules:
///
/// - The first record is the header; column order is preserved.
/// - Blank (or whitespace-only) cells become [`Value::Null`].
/// - With `infer_numbers`, cells that read as integers/floats become [`Value::Int64`] /
///   [`Value::Float64`]; everything else is kept verbatim as [`Value::Utf8`].
/// - Short records are padded with nulls; extra trailing fields are ignored.
pub fn ingest_csv_from_path(path: impl AsRef<Path>, infer_numbers: bool) -> ReconcileResult<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    ingest_csv_from_reader(&mut rdr, infer_numbers)
}

/// Load CSV data from an existing CSV reader.
pub fn ingest_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    infer_numbers: bool,
) -> ReconcileResult<Table> {
    let headers = rdr.headers()?.clone();
    let schema = Schema::new(headers.iter());
    let width = schema.len();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let mut row: Vec<Value> = record
            .iter()
            .take(width)
            .map(|raw| parse_cell(raw, infer_numbers))
            .collect();
        row.resize(width, Value::Null);
        rows.push(row);
    }

    Ok(Table::new(schema, rows))
}

fn parse_cell(raw: &str, infer_numbers: bool) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if infer_numbers && looks_numeric(trimmed) {
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int64(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Value::Float64(f);
        }
    }
    Value::Utf8(raw.to_owned())
}

// Rejects words `f64::from_str` accepts ("inf", "NaN") and codes with leading zeros ("007"),
// which should stay text.
fn looks_numeric(s: &str) -> bool {
    let digits = s.trim_start_matches(['-', '+']);
    let leading_zero = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') && !leading_zero
}
