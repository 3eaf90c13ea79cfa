//! Running comparisons: request dispatch, batching, metrics and observer hooks.
//!
//! This module sits "above" [`crate::compare`] and provides:
//!
//! - [`ComparisonRequest`]: one serializable description of which engine to run and with what
//!   options (loadable from JSON)
//! - [`ComparisonRunner`]: runs single requests or batches of independent jobs on a rayon pool
//! - Real-time metrics + observer hooks for monitoring

mod observer;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::compare::{
    calc_difference, diff_sheets, stacked_compare, DeltaOptions, DeltaOutcome, SheetDiffOptions, SheetDiffOutcome,
    StackedOptions, StackedOutcome,
};
use crate::error::{ReconcileError, ReconcileResult, RunError};
use crate::types::Table;

pub use observer::{
    ComparisonEvent, ComparisonMetrics, ComparisonMetricsSnapshot, ComparisonObserver, StdErrComparisonObserver,
};

/// Which engine a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    SheetDifference,
    Stacked,
    CalculationDifference,
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SheetDifference => "sheet_difference",
            Self::Stacked => "stacked",
            Self::CalculationDifference => "calculation_difference",
        })
    }
}

/// One comparison to run, with its engine options.
///
/// Serialized with a `type` tag:
///
/// ```rust
/// use sheet_reconcile::execution::{ComparisonKind, ComparisonRequest};
///
/// let req = ComparisonRequest::from_json_str(
///     r#"{"type": "calculation_difference", "key_column": "ID",
///         "value_column_a": "Amount", "value_column_b": "Amount"}"#,
/// )
/// .unwrap();
/// assert_eq!(req.kind(), ComparisonKind::CalculationDifference);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComparisonRequest {
    SheetDifference(SheetDiffOptions),
    Stacked(StackedOptions),
    CalculationDifference(DeltaOptions),
}

impl ComparisonRequest {
    /// Parse a request from JSON.
    pub fn from_json_str(s: &str) -> ReconcileResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn kind(&self) -> ComparisonKind {
        match self {
            Self::SheetDifference(_) => ComparisonKind::SheetDifference,
            Self::Stacked(_) => ComparisonKind::Stacked,
            Self::CalculationDifference(_) => ComparisonKind::CalculationDifference,
        }
    }
}

/// Result of one [`ComparisonRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonOutcome {
    SheetDifference(SheetDiffOutcome),
    Stacked(StackedOutcome),
    CalculationDifference(DeltaOutcome),
}

impl ComparisonOutcome {
    pub fn kind(&self) -> ComparisonKind {
        match self {
            Self::SheetDifference(_) => ComparisonKind::SheetDifference,
            Self::Stacked(_) => ComparisonKind::Stacked,
            Self::CalculationDifference(_) => ComparisonKind::CalculationDifference,
        }
    }

    /// Total rows across the outcome's result tables.
    pub fn rows_out(&self) -> usize {
        match self {
            Self::SheetDifference(o) => o.only_in_a.row_count() + o.only_in_b.row_count(),
            Self::Stacked(o) => o.combined.row_count(),
            Self::CalculationDifference(o) => o.merged.row_count(),
        }
    }

    /// The outcome's summary as one `key=value` line.
    pub fn summary_line(&self) -> String {
        match self {
            Self::SheetDifference(o) => o.summary.to_string(),
            Self::Stacked(o) => o.summary.to_string(),
            Self::CalculationDifference(o) => o.summary.to_string(),
        }
    }

    /// The summary as a JSON value.
    pub fn summary_json(&self) -> ReconcileResult<serde_json::Value> {
        let v = match self {
            Self::SheetDifference(o) => serde_json::to_value(o.summary)?,
            Self::Stacked(o) => serde_json::to_value(o.summary)?,
            Self::CalculationDifference(o) => serde_json::to_value(o.summary)?,
        };
        Ok(v)
    }
}

/// Two tables and the comparison to run on them.
#[derive(Debug, Clone)]
pub struct ComparisonJob<'a> {
    pub a: &'a Table,
    pub b: &'a Table,
    pub request: ComparisonRequest,
}

/// Configuration for the [`ComparisonRunner`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Number of worker threads used for batches.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self { num_threads: Some(n) }
    }
}

/// Runs comparisons and reports what happened.
///
/// A single [`run`](Self::run) executes on the calling thread; [`run_batch`](Self::run_batch)
/// spreads independent jobs over the runner's pool. Engines share no state, so jobs never wait
/// on each other.
pub struct ComparisonRunner {
    pool: ThreadPool,
    observer: Option<Arc<dyn ComparisonObserver>>,
    metrics: Arc<ComparisonMetrics>,
}

impl fmt::Debug for ComparisonRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparisonRunner")
            .field("threads", &self.pool.current_num_threads())
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl ComparisonRunner {
    /// Create a new runner with the given options.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::Configuration`] if `num_threads == Some(0)` or the pool cannot be built.
    pub fn new(opts: ExecutionOptions) -> ReconcileResult<Self> {
        if opts.num_threads == Some(0) {
            return Err(ReconcileError::configuration("num_threads must be > 0 when set"));
        }

        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| ReconcileError::configuration(format!("failed to build thread pool: {e}")))?;

        Ok(Self {
            pool,
            observer: None,
            metrics: Arc::new(ComparisonMetrics::new()),
        })
    }

    /// Attach an observer for comparison events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ComparisonObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time metrics.
    pub fn metrics(&self) -> Arc<ComparisonMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run one comparison.
    pub fn run(&self, a: &Table, b: &Table, request: &ComparisonRequest) -> Result<ComparisonOutcome, RunError> {
        let kind = request.kind();
        let start = Instant::now();
        self.metrics.on_run_start(a.row_count() + b.row_count());
        self.emit(ComparisonEvent::RunStarted {
            kind,
            rows_a: a.row_count(),
            rows_b: b.row_count(),
        });

        let result = dispatch(a, b, request);
        let elapsed = start.elapsed();

        match &result {
            Ok(outcome) => {
                let rows_out = outcome.rows_out();
                self.metrics.on_run_success(rows_out, elapsed);
                self.emit(ComparisonEvent::RunFinished {
                    kind,
                    elapsed,
                    rows_out,
                });
            }
            Err(e) => {
                self.metrics.on_run_failure(elapsed);
                self.emit(ComparisonEvent::RunFailed {
                    kind,
                    elapsed,
                    expected: e.is_expected(),
                    message: e.to_string(),
                });
            }
        }

        result
    }

    /// Run independent jobs in parallel.
    ///
    /// Results are returned in job order; one job failing does not affect the others.
    pub fn run_batch(&self, jobs: &[ComparisonJob<'_>]) -> Vec<Result<ComparisonOutcome, RunError>> {
        let start = Instant::now();
        self.emit(ComparisonEvent::BatchStarted { jobs: jobs.len() });

        let results: Vec<Result<ComparisonOutcome, RunError>> = self.pool.install(|| {
            jobs.par_iter()
                .map(|job| self.run(job.a, job.b, &job.request))
                .collect()
        });

        self.emit(ComparisonEvent::BatchFinished {
            jobs: jobs.len(),
            failed: results.iter().filter(|r| r.is_err()).count(),
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });
        results
    }

    fn emit(&self, event: ComparisonEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

fn dispatch(a: &Table, b: &Table, request: &ComparisonRequest) -> Result<ComparisonOutcome, RunError> {
    let outcome = match request {
        ComparisonRequest::SheetDifference(opts) => ComparisonOutcome::SheetDifference(diff_sheets(a, b, opts)?),
        ComparisonRequest::Stacked(opts) => ComparisonOutcome::Stacked(stacked_compare(a, b, opts)?),
        ComparisonRequest::CalculationDifference(opts) => {
            ComparisonOutcome::CalculationDifference(calc_difference(a, b, opts)?)
        }
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::{ComparisonKind, ComparisonRequest, ComparisonRunner, ExecutionOptions};
    use std::sync::{Arc, Mutex};

    use crate::compare::{SheetDiffOptions, StackedOptions};
    use crate::execution::{ComparisonEvent, ComparisonObserver};
    use crate::types::{Schema, Table, Value};

    fn ids(values: &[&str]) -> Table {
        Table::new(
            Schema::new(["ID"]),
            values.iter().map(|v| vec![Value::text(*v)]).collect(),
        )
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ComparisonEvent>>,
    }

    impl ComparisonObserver for Recorder {
        fn on_event(&self, event: &ComparisonEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn zero_threads_is_a_configuration_error() {
        let err = ComparisonRunner::new(ExecutionOptions { num_threads: Some(0) }).unwrap_err();
        assert!(err.to_string().contains("num_threads"));
    }

    #[test]
    fn request_json_uses_type_tag() {
        let req = ComparisonRequest::from_json_str(r#"{"type": "stacked", "name_a": "Ledger"}"#).unwrap();
        assert_eq!(
            req,
            ComparisonRequest::Stacked(StackedOptions {
                name_a: "Ledger".into(),
                ..StackedOptions::default()
            })
        );

        let json = serde_json::to_value(ComparisonRequest::SheetDifference(SheetDiffOptions::same_columns(["ID"])))
            .unwrap();
        assert_eq!(json["type"], "sheet_difference");
        assert_eq!(json["columns_a"][0], "ID");

        assert!(ComparisonRequest::from_json_str(r#"{"type": "pivot"}"#).is_err());
    }

    #[test]
    fn run_reports_events_and_metrics() {
        let recorder = Arc::new(Recorder::default());
        let runner = ComparisonRunner::new(ExecutionOptions { num_threads: Some(1) })
            .unwrap()
            .with_observer(recorder.clone());

        let a = ids(&["1", "2"]);
        let b = ids(&["2", "3"]);
        let ok = runner
            .run(&a, &b, &ComparisonRequest::SheetDifference(SheetDiffOptions::same_columns(["ID"])))
            .unwrap();
        assert_eq!(ok.kind(), ComparisonKind::SheetDifference);
        assert_eq!(ok.rows_out(), 2);

        let err = runner
            .run(&a, &b, &ComparisonRequest::SheetDifference(SheetDiffOptions::same_columns(["Nope"])))
            .unwrap_err();
        assert!(err.is_expected());

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[1], ComparisonEvent::RunFinished { rows_out: 2, .. }));
        assert!(matches!(events[3], ComparisonEvent::RunFailed { expected: true, .. }));

        let snap = runner.metrics().snapshot();
        assert_eq!(snap.runs_started, 2);
        assert_eq!(snap.runs_succeeded, 1);
        assert_eq!(snap.runs_failed, 1);
        assert_eq!(snap.rows_in, 8);
        assert_eq!(snap.rows_out, 2);
        assert_eq!(snap.max_active_runs, 1);
    }
}
