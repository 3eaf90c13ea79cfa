use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::ComparisonKind;

/// Events emitted by the [`super::ComparisonRunner`].
#[derive(Debug, Clone)]
pub enum ComparisonEvent {
    RunStarted {
        kind: ComparisonKind,
        rows_a: usize,
        rows_b: usize,
    },
    RunFinished {
        kind: ComparisonKind,
        elapsed: Duration,
        rows_out: usize,
    },
    RunFailed {
        kind: ComparisonKind,
        elapsed: Duration,
        /// `false` when the failure came from malformed input rather than caller parameters.
        expected: bool,
        message: String,
    },
    BatchStarted {
        jobs: usize,
    },
    BatchFinished {
        jobs: usize,
        failed: usize,
        elapsed: Duration,
        metrics: ComparisonMetricsSnapshot,
    },
}

/// Observer hook for comparison events.
pub trait ComparisonObserver: Send + Sync {
    fn on_event(&self, event: &ComparisonEvent);
}

/// A simple stderr logger for comparison events.
#[derive(Debug, Default)]
pub struct StdErrComparisonObserver;

impl ComparisonObserver for StdErrComparisonObserver {
    fn on_event(&self, event: &ComparisonEvent) {
        match event {
            ComparisonEvent::RunFailed {
                kind,
                expected,
                message,
                ..
            } => eprintln!("[compare][{kind}][failed] expected={expected} err={message}"),
            ComparisonEvent::BatchFinished { metrics, .. } => eprintln!("[compare][batch] {metrics}"),
            other => eprintln!("[compare] {other:?}"),
        }
    }
}

/// Cumulative counters for every run made through one runner.
///
/// Runs in a batch update these concurrently; callers can snapshot them at any time.
#[derive(Debug, Default)]
pub struct ComparisonMetrics {
    runs_started: AtomicU64,
    runs_succeeded: AtomicU64,
    runs_failed: AtomicU64,
    rows_in: AtomicU64,
    rows_out: AtomicU64,
    busy_ns: AtomicU64,

    active_runs: AtomicUsize,
    max_active_runs: AtomicUsize,
}

impl ComparisonMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_run_start(&self, rows_in: usize) {
        let _ = self.runs_started.fetch_add(1, Ordering::SeqCst);
        let _ = self.rows_in.fetch_add(rows_in as u64, Ordering::SeqCst);
        let now = self.active_runs.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_runs, now);
    }

    pub(crate) fn on_run_success(&self, rows_out: usize, elapsed: Duration) {
        let _ = self.runs_succeeded.fetch_add(1, Ordering::SeqCst);
        let _ = self.rows_out.fetch_add(rows_out as u64, Ordering::SeqCst);
        self.on_run_end(elapsed);
    }

    pub(crate) fn on_run_failure(&self, elapsed: Duration) {
        let _ = self.runs_failed.fetch_add(1, Ordering::SeqCst);
        self.on_run_end(elapsed);
    }

    fn on_run_end(&self, elapsed: Duration) {
        let add = elapsed.as_nanos().min(u64::MAX as u128) as u64;
        let _ = self.busy_ns.fetch_add(add, Ordering::SeqCst);
        let _ = self.active_runs.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ComparisonMetricsSnapshot {
        ComparisonMetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::SeqCst),
            runs_succeeded: self.runs_succeeded.load(Ordering::SeqCst),
            runs_failed: self.runs_failed.load(Ordering::SeqCst),
            rows_in: self.rows_in.load(Ordering::SeqCst),
            rows_out: self.rows_out.load(Ordering::SeqCst),
            busy: Duration::from_nanos(self.busy_ns.load(Ordering::SeqCst)),
            max_active_runs: self.max_active_runs.load(Ordering::SeqCst),
        }
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`ComparisonMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonMetricsSnapshot {
    pub runs_started: u64,
    pub runs_succeeded: u64,
    pub runs_failed: u64,
    /// Input rows across both tables of every run.
    pub rows_in: u64,
    /// Output rows of successful runs.
    pub rows_out: u64,
    /// Sum of per-run wall time (exceeds elapsed time when runs overlap).
    pub busy: Duration,
    pub max_active_runs: usize,
}

impl fmt::Display for ComparisonMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "runs={}/{} failed={}, rows_in={}, rows_out={}, max_active_runs={}, busy={:?}",
            self.runs_succeeded,
            self.runs_started,
            self.runs_failed,
            self.rows_in,
            self.rows_out,
            self.max_active_runs,
            self.busy
        )
    }
}
