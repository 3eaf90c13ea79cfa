use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ReconcileError;

use super::unified::IngestionFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the table could not be loaded).
    Error,
    /// Critical error (typically I/O failures such as a missing upload).
    Critical,
}

/// Which input is being loaded.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Source path.
    pub path: PathBuf,
    /// Format used for loading.
    pub format: IngestionFormat,
    /// Sheet requested for workbook formats (`None` = first sheet, or not a workbook).
    pub sheet: Option<String>,
}

impl fmt::Display for IngestionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "format={:?} path={}", self.format, self.path.display())?;
        if let Some(sheet) = &self.sheet {
            write!(f, " sheet={sheet}")?;
        }
        Ok(())
    }
}

/// Shape of a successfully loaded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Number of data rows (header excluded).
    pub rows: usize,
    /// Number of columns.
    pub columns: usize,
}

/// Observer interface for table-loading outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when a table loads.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when loading fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &ReconcileError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &ReconcileError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &ReconcileError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &ReconcileError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs load events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl IngestionObserver for StdErrObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        eprintln!("[load][ok] {ctx} rows={} columns={}", stats.rows, stats.columns);
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &ReconcileError) {
        eprintln!("[load][{severity:?}] {ctx} err={error}");
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &ReconcileError) {
        eprintln!("[ALERT][load][{severity:?}] {ctx} err={error}");
    }
}

/// Appends load events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append_line(&format!(
            "{} ok {ctx} rows={} columns={}",
            unix_ts(),
            stats.rows,
            stats.columns
        ));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &ReconcileError) {
        self.append_line(&format!("{} fail severity={severity:?} {ctx} err={error}", unix_ts()));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &ReconcileError) {
        self.append_line(&format!("{} ALERT severity={severity:?} {ctx} err={error}", unix_ts()));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
