use thiserror::Error;

use crate::types::Side;

/// Convenience result type for loading, comparison and export operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Error type returned by loaders, the set-difference and stacked engines, and exporters.
///
/// Engines return these directly; the numeric-delta engine wraps them in [`DeltaError`].
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Excel reading error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[cfg(feature = "xlsx_export")]
    /// Workbook writing error (feature-gated behind `xlsx_export`).
    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// CSV read/write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (request/config) error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Caller-supplied parameters are structurally invalid. Raised before any computation.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A named column could not be resolved in one of the input tables.
    #[error("column '{column}' not found in table {side}")]
    Lookup { column: String, side: Side },

    /// A table does not have the expected shape (ragged rows, missing header, unknown format).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },
}

impl ReconcileError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn lookup(column: impl Into<String>, side: Side) -> Self {
        Self::Lookup {
            column: column.into(),
            side,
        }
    }
}

/// Where a numeric-delta run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaStage {
    /// Resolving the key/value columns or validating options.
    Resolve,
    /// Joining rows and computing differences.
    Compute,
}

/// Single descriptive failure reported by [`crate::compare::calc_difference`].
///
/// The numeric-delta engine never returns partial output: every failure during resolution or
/// computation is folded into one of these. The underlying structured error stays reachable via
/// [`DeltaError::source`](std::error::Error::source) and [`DeltaError::cause`].
#[derive(Debug, Error)]
#[error("error while computing differences: {cause}")]
pub struct DeltaError {
    stage: DeltaStage,
    #[source]
    cause: ReconcileError,
}

impl DeltaError {
    pub(crate) fn new(stage: DeltaStage, cause: ReconcileError) -> Self {
        Self { stage, cause }
    }

    /// Stage at which the run failed.
    pub fn stage(&self) -> DeltaStage {
        self.stage
    }

    /// The structured error behind this failure.
    pub fn cause(&self) -> &ReconcileError {
        &self.cause
    }

    /// `true` for failures a caller can anticipate (unknown column, bad options).
    ///
    /// Anything else (malformed tables discovered mid-computation) is unexpected.
    pub fn is_expected(&self) -> bool {
        matches!(
            self.cause,
            ReconcileError::Lookup { .. } | ReconcileError::Configuration { .. }
        )
    }
}

/// Error returned by [`crate::execution::ComparisonRunner`].
#[derive(Debug, Error)]
pub enum RunError {
    /// Set-difference or stacked engine failure.
    #[error(transparent)]
    Compare(#[from] ReconcileError),
    /// Numeric-delta engine failure.
    #[error(transparent)]
    Delta(#[from] DeltaError),
}

impl RunError {
    /// `true` when the caller's parameters were at fault (unknown column, bad options).
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Compare(e) => matches!(
                e,
                ReconcileError::Lookup { .. } | ReconcileError::Configuration { .. }
            ),
            Self::Delta(e) => e.is_expected(),
        }
    }
}
