//! Core data model types.
//!
//! Loaders produce a [`Table`] (ordered column names plus row-major [`Value`] cells); the
//! comparison engines consume two of them and produce new tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered list of column names describing a [`Table`]'s row shape.
///
/// Names are kept verbatim; lookups are exact unless stated otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Schema {
    /// Ordered column names.
    pub columns: Vec<String>,
}

impl Schema {
    /// Create a new schema from column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// `true` if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.as_str())
    }

    /// Returns the index of the first column named exactly `name`, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the index of the first column whose trimmed, lowercased name equals the trimmed,
    /// lowercased `name`.
    pub fn index_of_ignore_case(&self, name: &str) -> Option<usize> {
        let target = name.trim().to_lowercase();
        self.columns
            .iter()
            .position(|c| c.trim().to_lowercase() == target)
    }
}

/// A single cell value.
///
/// Spreadsheet columns routinely mix text, numbers and blanks, so every cell carries its own
/// variant rather than the column carrying a type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Shorthand for a [`Value::Utf8`] cell.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Utf8(s.into())
    }

    /// `true` for [`Value::Null`] and NaN floats.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float64(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Hashable identity used for exact-duplicate detection.
    ///
    /// Integral floats share an identity with the equal integer (`5` and `5.0` are duplicates),
    /// but text never matches a number (`5` and `"5"` are distinct).
    pub fn identity(&self) -> CellIdentity {
        match self {
            Self::Null => CellIdentity::Null,
            Self::Int64(i) => CellIdentity::Int(*i),
            Self::Float64(f) if f.is_nan() => CellIdentity::Null,
            Self::Float64(f) if is_integral(*f) => CellIdentity::Int(*f as i64),
            Self::Float64(f) => CellIdentity::Float(f.to_bits()),
            Self::Bool(b) => CellIdentity::Bool(*b),
            Self::Utf8(s) => CellIdentity::Text(s.clone()),
        }
    }
}

/// Spreadsheet-style rendering: integral floats print without a fractional part, blanks print
/// as an empty string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int64(i) => write!(f, "{i}"),
            Self::Float64(v) if v.is_nan() => Ok(()),
            Self::Float64(v) if is_integral(*v) => write!(f, "{}", *v as i64),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Utf8(s) => f.write_str(s),
        }
    }
}

static NULL_CELL: Value = Value::Null;

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15
}

/// See [`Value::identity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellIdentity {
    Null,
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(String),
}

/// Which input table a row or column comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// In-memory table.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    /// Column names describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (`row`, `col`), if both are in range.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// All values of the named column, in row order. `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.index_of(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).unwrap_or(&NULL_CELL))
                .collect(),
        )
    }

    /// Verifies that every row has exactly one cell per column.
    pub fn check_shape(&self) -> Result<(), String> {
        let width = self.schema.len();
        match self.rows.iter().position(|r| r.len() != width) {
            None => Ok(()),
            Some(i) => Err(format!(
                "row {} has {} cells but the table has {} columns",
                i,
                self.rows[i].len(),
                width
            )),
        }
    }
}
