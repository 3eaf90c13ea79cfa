//! Table loading: the boundary where spreadsheet files become [`crate::types::Table`]s.
//!
//! Most callers should use [`load_table`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`IngestionOptions`])
//! - loads the chosen sheet (or CSV) preserving column order and raw cell types
//! - optionally reports success/failure/alerts to an [`IngestionObserver`]
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod observability;
pub mod unified;

pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    StdErrObserver,
};
pub use unified::{load_table, IngestionFormat, IngestionOptions, SheetSelection};
