//! Cell and key normalization shared by the comparison engines.
//!
//! - [`normalize_cell`]: type-insensitive comparison form (trimmed display string)
//! - [`normalize_key`]: same, but missing values have no key
//! - [`coerce_number`]: lenient numeric coercion; failures become `None`, never an error

use crate::error::{ReconcileError, ReconcileResult};
use crate::types::{Schema, Side, Value};

/// Trimmed string form of a cell. Missing values normalize to `""`.
///
/// This is what makes comparison type-insensitive: `Int64(5)`, `Float64(5.0)` and `"5 "` all
/// normalize to `"5"`.
pub fn normalize_cell(value: &Value) -> String {
    match value {
        Value::Utf8(s) => s.trim().to_owned(),
        other => other.to_string().trim().to_owned(),
    }
}

/// Normalized key for set membership, or `None` for a missing value.
pub fn normalize_key(value: &Value) -> Option<String> {
    if value.is_missing() {
        None
    } else {
        Some(normalize_cell(value))
    }
}

/// Coerce a cell to a number.
///
/// Booleans count as `1`/`0`; text is trimmed and parsed. Blank or unparseable text, NaN and
/// nulls yield `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Null => return None,
        Value::Int64(i) => *i as f64,
        Value::Float64(f) => *f,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Utf8(s) => s.trim().parse::<f64>().ok()?,
    };
    if n.is_nan() { None } else { Some(n) }
}

/// Index of the column named exactly `name` in `schema`.
pub fn resolve_column(schema: &Schema, name: &str, side: Side) -> ReconcileResult<usize> {
    schema
        .index_of(name)
        .ok_or_else(|| ReconcileError::lookup(name, side))
}

/// Index of the column matching `name` case- and surrounding-whitespace-insensitively.
pub fn resolve_column_ignore_case(
    schema: &Schema,
    name: &str,
    side: Side,
) -> ReconcileResult<usize> {
    schema
        .index_of_ignore_case(name)
        .ok_or_else(|| ReconcileError::lookup(name, side))
}
