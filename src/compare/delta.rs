//! Numeric delta between two tables joined on a key column.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DeltaError, DeltaStage, ReconcileError, ReconcileResult};
use crate::normalize::{coerce_number, normalize_key, resolve_column};
use crate::types::{Schema, Side, Table, Value};

use super::ensure_shape;

/// Name of the derived difference column.
pub const DIFFERENCE_COLUMN: &str = "Difference";

/// Parameters for [`calc_difference`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeltaOptions {
    /// Key column, present under this exact name in both tables.
    pub key_column: String,
    /// Numeric column taken from table A.
    pub value_column_a: String,
    /// Numeric column taken from table B.
    pub value_column_b: String,
}

/// Aggregates reported by [`calc_difference`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DeltaSummary {
    /// Number of joined rows.
    pub count: usize,
    /// Mean of the defined differences; `None` when no row has one.
    pub mean_difference: Option<f64>,
    /// Rows where A's value is greater than B's.
    pub positive_count: usize,
    /// Rows where A's value is less than B's.
    pub negative_count: usize,
}

impl fmt::Display for DeltaSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "count={}, mean_difference=", self.count)?;
        match self.mean_difference {
            Some(m) => write!(f, "{m:.2}")?,
            None => f.write_str("n/a")?,
        }
        write!(
            f,
            ", positive={}, negative={}",
            self.positive_count, self.negative_count
        )
    }
}

/// Result of [`calc_difference`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaOutcome {
    /// Columns: key, A's value, B's value, `Difference`. Unparseable values are `Null`.
    pub merged: Table,
    pub summary: DeltaSummary,
}

struct Resolved {
    key_a: usize,
    key_b: usize,
    value_a: usize,
    value_b: usize,
}

/// Inner-join `a` and `b` on the normalized key and compute `A - B` per joined row.
///
/// - Keys are trimmed display strings compared case-sensitively; blank keys never join.
/// - Duplicate keys join as a cross product, in A order then B order.
/// - A value that cannot be read as a number becomes `Null`, and so does its difference.
/// - Rows without a partner are dropped.
///
/// If both value columns have the same name, the output names them `<name>_x` and `<name>_y`.
///
/// # Errors
///
/// Every failure is reported as a single [`DeltaError`]; no partial output is produced.
/// [`DeltaError::is_expected`] tells column/option problems apart from malformed tables.
pub fn calc_difference(a: &Table, b: &Table, options: &DeltaOptions) -> Result<DeltaOutcome, DeltaError> {
    let resolved = resolve(a, b, options).map_err(|e| DeltaError::new(DeltaStage::Resolve, e))?;
    compute(a, b, options, &resolved).map_err(|e| DeltaError::new(DeltaStage::Compute, e))
}

fn resolve(a: &Table, b: &Table, options: &DeltaOptions) -> ReconcileResult<Resolved> {
    if options.key_column.trim().is_empty() {
        return Err(ReconcileError::configuration("key column name is empty"));
    }
    if options.value_column_a == options.key_column || options.value_column_b == options.key_column {
        return Err(ReconcileError::configuration(format!(
            "value columns must differ from the key column '{}'",
            options.key_column
        )));
    }

    Ok(Resolved {
        key_a: resolve_column(&a.schema, &options.key_column, Side::A)?,
        key_b: resolve_column(&b.schema, &options.key_column, Side::B)?,
        value_a: resolve_column(&a.schema, &options.value_column_a, Side::A)?,
        value_b: resolve_column(&b.schema, &options.value_column_b, Side::B)?,
    })
}

fn compute(a: &Table, b: &Table, options: &DeltaOptions, r: &Resolved) -> ReconcileResult<DeltaOutcome> {
    ensure_shape(a, Side::A)?;
    ensure_shape(b, Side::B)?;

    let mut index_b: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in b.rows.iter().enumerate() {
        if let Some(k) = normalize_key(&row[r.key_b]) {
            index_b.entry(k).or_default().push(i);
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    let mut summary = DeltaSummary::default();
    let mut sum = 0.0_f64;
    let mut defined = 0usize;

    for row_a in &a.rows {
        let Some(key) = normalize_key(&row_a[r.key_a]) else {
            continue;
        };
        let Some(matches) = index_b.get(&key) else {
            continue;
        };
        let va = coerce_number(&row_a[r.value_a]);
        for &i in matches {
            let vb = coerce_number(&b.rows[i][r.value_b]);
            let diff = match (va, vb) {
                // inf - inf is undefined, not a difference.
                (Some(x), Some(y)) => Some(x - y).filter(|d| !d.is_nan()),
                _ => None,
            };
            if let Some(d) = diff {
                sum += d;
                defined += 1;
                if d > 0.0 {
                    summary.positive_count += 1;
                } else if d < 0.0 {
                    summary.negative_count += 1;
                }
            }
            rows.push(vec![
                Value::text(key.as_str()),
                number_cell(va),
                number_cell(vb),
                number_cell(diff),
            ]);
        }
    }

    summary.count = rows.len();
    summary.mean_difference = (defined > 0).then(|| sum / defined as f64);

    Ok(DeltaOutcome {
        merged: Table::new(output_schema(options), rows),
        summary,
    })
}

fn output_schema(options: &DeltaOptions) -> Schema {
    let (name_a, name_b) = if options.value_column_a == options.value_column_b {
        (
            format!("{}_x", options.value_column_a),
            format!("{}_y", options.value_column_b),
        )
    } else {
        (options.value_column_a.clone(), options.value_column_b.clone())
    };
    Schema::new([
        options.key_column.clone(),
        name_a,
        name_b,
        DIFFERENCE_COLUMN.to_string(),
    ])
}

fn number_cell(v: Option<f64>) -> Value {
    v.map_or(Value::Null, Value::Float64)
}
