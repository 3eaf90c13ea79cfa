use std::sync::{Arc, Mutex};

use sheet_reconcile::ingestion::{
    load_table, CompositeObserver, FileObserver, IngestionContext, IngestionFormat, IngestionObserver,
    IngestionOptions, IngestionSeverity, IngestionStats,
};
use sheet_reconcile::ReconcileError;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<IngestionStats>>,
    failures: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, _ctx: &IngestionContext, stats: IngestionStats) {
        self.successes.lock().unwrap().push(stats);
    }

    fn on_failure(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &ReconcileError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &ReconcileError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

#[test]
fn observer_receives_row_and_column_counts_on_success() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };

    let t = load_table("tests/fixtures/ledger_b.csv", &opts).unwrap();

    assert_eq!(t.row_count(), 4);
    assert_eq!(
        obs.successes.lock().unwrap().clone(),
        vec![IngestionStats { rows: 4, columns: 4 }]
    );
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        format: Some(IngestionFormat::Csv),
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Critical,
        ..Default::default()
    };

    // Missing file -> Io error -> Critical
    let _ = load_table("tests/fixtures/does_not_exist.csv", &opts).unwrap_err();

    assert_eq!(obs.failures.lock().unwrap().clone(), vec![IngestionSeverity::Critical]);
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![IngestionSeverity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_non_critical_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        format: Some(IngestionFormat::Csv),
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Critical,
        ..Default::default()
    };

    // Invalid UTF-8 -> csv parse error -> Error
    let path = std::env::temp_dir().join(format!(
        "sheet-reconcile-bad-utf8-{}.csv",
        std::process::id()
    ));
    std::fs::write(&path, b"id,name\n1,\xff\xfe\n").unwrap();

    let _ = load_table(&path, &opts).unwrap_err();
    let _ = std::fs::remove_file(&path);

    assert_eq!(obs.failures.lock().unwrap().clone(), vec![IngestionSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn format_inference_failure_happens_before_observer() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };

    let err = load_table("tests/fixtures/notes.txt", &opts).unwrap_err();
    assert!(matches!(err, ReconcileError::SchemaMismatch { .. }));
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn composite_and_file_observers_fan_out() {
    let log_path = std::env::temp_dir().join(format!(
        "sheet-reconcile-load-log-{}.log",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&log_path);

    let recording = Arc::new(RecordingObserver::default());
    let observers: Vec<Arc<dyn IngestionObserver>> =
        vec![recording.clone() as Arc<dyn IngestionObserver>, Arc::new(FileObserver::new(&log_path))];
    let composite = CompositeObserver::new(observers);
    let opts = IngestionOptions {
        observer: Some(Arc::new(composite)),
        alert_at_or_above: IngestionSeverity::Error,
        ..Default::default()
    };

    let _ = load_table("tests/fixtures/ledger_a.csv", &opts).unwrap();
    let _ = load_table("tests/fixtures/missing.csv", &opts).unwrap_err();

    assert_eq!(recording.successes.lock().unwrap().len(), 1);
    assert_eq!(recording.alerts.lock().unwrap().clone(), vec![IngestionSeverity::Critical]);

    let log = std::fs::read_to_string(&log_path).unwrap();
    let _ = std::fs::remove_file(&log_path);
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains(" ok format=Csv"));
    assert!(lines[0].contains("rows=4 columns=3"));
    assert!(lines[1].contains(" fail severity=Critical"));
    assert!(lines[2].contains(" ALERT severity=Critical"));
}
