//! Unified table-loading entrypoint.
//!
//! Most callers should use [`load_table`], which reads a CSV file or a workbook sheet into an
//! in-memory [`crate::types::Table`].
//!
//! - If [`IngestionOptions::format`] is `None`, the format is inferred from the file extension.
//! - If an [`super::observability::IngestionObserver`] is provided, success/failure/alerts are
//!   reported to it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ReconcileError, ReconcileResult};
use crate::types::Table;

use super::csv;
use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated values.
    Csv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl IngestionFormat {
    /// Parse an input format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// Which sheet of a workbook to load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SheetSelection {
    /// The first sheet (default).
    #[default]
    First,
    /// A single named sheet.
    Named(String),
}

impl SheetSelection {
    fn name(&self) -> Option<&str> {
        match self {
            Self::First => None,
            Self::Named(name) => Some(name),
        }
    }
}

/// Options controlling [`load_table`].
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, infer the format from the file extension.
    pub format: Option<IngestionFormat>,
    /// Workbook sheet to read (ignored for CSV).
    pub sheet: SheetSelection,
    /// Read numeric-looking CSV cells as numbers (workbooks always keep their cell types).
    pub infer_numbers: bool,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("sheet", &self.sheet)
            .field("infer_numbers", &self.infer_numbers)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            sheet: SheetSelection::default(),
            infer_numbers: true,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Load a table from `path`.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row/column counts
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```no_run
/// use sheet_reconcile::ingestion::{load_table, IngestionOptions, SheetSelection};
///
/// # fn main() -> Result<(), sheet_reconcile::ReconcileError> {
/// let a = load_table("ledger.csv", &IngestionOptions::default())?;
///
/// // Workbooks need the `excel` feature.
/// let opts = IngestionOptions {
///     sheet: SheetSelection::Named("March".to_string()),
///     ..Default::default()
/// };
/// let b = load_table("bank.xlsx", &opts)?;
/// println!("a={} b={}", a.row_count(), b.row_count());
/// # Ok(())
/// # }
/// ```
pub fn load_table(path: impl AsRef<Path>, options: &IngestionOptions) -> ReconcileResult<Table> {
    let path = path.as_ref();
    let fmt = match options.format {
        Some(f) => f,
        None => infer_format_from_path(path)?,
    };

    let ctx = IngestionContext {
        path: path.to_path_buf(),
        format: fmt,
        sheet: match fmt {
            IngestionFormat::Excel => options.sheet.name().map(str::to_string),
            IngestionFormat::Csv => None,
        },
    };

    let result = match fmt {
        IngestionFormat::Csv => csv::ingest_csv_from_path(path, options.infer_numbers),
        IngestionFormat::Excel => load_excel_dispatch(path, &options.sheet),
    };

    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(table) => obs.on_success(
                &ctx,
                IngestionStats {
                    rows: table.row_count(),
                    columns: table.schema.len(),
                },
            ),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(&ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }

    result
}

fn severity_for_error(e: &ReconcileError) -> IngestionSeverity {
    match e {
        ReconcileError::Io(_) => IngestionSeverity::Critical,
        ReconcileError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        #[cfg(feature = "excel")]
        ReconcileError::Excel(calamine::Error::Io(_)) => IngestionSeverity::Critical,
        _ => IngestionSeverity::Error,
    }
}

fn infer_format_from_path(path: &Path) -> ReconcileResult<IngestionFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ReconcileError::SchemaMismatch {
            message: format!(
                "cannot infer format: path has no extension ({})",
                path.display()
            ),
        })?;

    IngestionFormat::from_extension(ext).ok_or_else(|| ReconcileError::SchemaMismatch {
        message: format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ),
    })
}

fn load_excel_dispatch(path: &Path, sheet: &SheetSelection) -> ReconcileResult<Table> {
    #[cfg(feature = "excel")]
    {
        super::excel::ingest_excel_from_path(path, sheet.name())
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (path, sheet);
        Err(ReconcileError::SchemaMismatch {
            message: "excel loading not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}
