use std::{
    io,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use pgextra_core::{Error, ExecutionError, Result, Settings};
use pgextra_postgres::{BackendCanceller, CancellationAction, MigrationTimeout, TimeoutStage};
use pgextra_testkit::RecordingAdapter;

#[derive(Clone, Default)]
struct RecordingCanceller {
    signals: Arc<Mutex<Vec<(i32, CancellationAction)>>>,
}

impl RecordingCanceller {
    fn signals(&self) -> Vec<(i32, CancellationAction)> {
        self.signals.lock().expect("signals lock should not be poisoned").clone()
    }
}

impl BackendCanceller for RecordingCanceller {
    fn cancel(&mut self, pid: i32, action: CancellationAction) -> Result<()> {
        self.signals
            .lock()
            .expect("signals lock should not be poisoned")
            .push((pid, action));
        Ok(())
    }
}

fn cancelled_statement() -> Error {
    ExecutionError::statement_failed(
        0,
        "SELECT pg_sleep(60)",
        0,
        None,
        io::Error::other("canceling statement due to user request"),
    )
    .into()
}

#[test]
fn stages_are_ordered_by_delay() {
    let timeout = MigrationTimeout::terminate_after(Duration::from_secs(30))
        .stage(Duration::from_secs(10), CancellationAction::CancelStatement);

    assert_eq!(
        timeout.stages(),
        &[
            TimeoutStage {
                after: Duration::from_secs(10),
                action: CancellationAction::CancelStatement,
            },
            TimeoutStage {
                after: Duration::from_secs(30),
                action: CancellationAction::TerminateBackend,
            },
        ]
    );
    assert_eq!(CancellationAction::CancelStatement.sql(), "SELECT pg_cancel_backend($1)");
    assert_eq!(CancellationAction::TerminateBackend.to_string(), "terminate_backend");
}

#[test]
fn settings_drive_the_default_timeout() {
    assert!(MigrationTimeout::from_settings(&Settings::default()).is_disabled());

    let settings = Settings {
        migration_timeout: Some(Duration::from_secs(5)),
        ..Settings::default()
    };
    assert_eq!(
        MigrationTimeout::from_settings(&settings),
        MigrationTimeout::cancel_after(Duration::from_secs(5))
    );
}

#[test]
fn disabled_timeout_just_runs_the_work() {
    let mut adapter = RecordingAdapter::new();
    let canceller = RecordingCanceller::default();

    let value = MigrationTimeout::none()
        .run_with(&mut adapter, canceller.clone(), |_| Ok(7))
        .expect("work should succeed");

    assert_eq!(value, 7);
    assert!(canceller.signals().is_empty());
}

#[test]
fn fast_work_is_never_cancelled() {
    let mut adapter = RecordingAdapter::new();
    let canceller = RecordingCanceller::default();

    MigrationTimeout::cancel_after(Duration::from_secs(30))
        .run_with(&mut adapter, canceller.clone(), |adapter| adapter.execute("SELECT 1"))
        .expect("work should succeed");

    assert!(canceller.signals().is_empty());
    assert_eq!(adapter.executed_sql(), vec!["SELECT 1"]);
}

#[test]
fn slow_work_is_cancelled_and_reported_as_timeout() {
    let mut adapter = RecordingAdapter::new().with_backend_pid(99);
    let canceller = RecordingCanceller::default();

    let error = MigrationTimeout::cancel_after(Duration::from_millis(20))
        .run_with(&mut adapter, canceller.clone(), |_| -> Result<()> {
            thread::sleep(Duration::from_millis(300));
            Err(cancelled_statement())
        })
        .expect_err("work should time out");

    match error {
        Error::Execute(ExecutionError::Timeout { elapsed, action }) => {
            assert_eq!(action, "cancel_statement");
            assert!(elapsed >= Duration::from_millis(20));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(canceller.signals(), vec![(99, CancellationAction::CancelStatement)]);
}

#[test]
fn escalates_to_termination_when_cancel_is_not_enough() {
    let mut adapter = RecordingAdapter::new().with_backend_pid(5);
    let canceller = RecordingCanceller::default();

    let error = MigrationTimeout::cancel_after(Duration::from_millis(20))
        .stage(Duration::from_millis(60), CancellationAction::TerminateBackend)
        .run_with(&mut adapter, canceller.clone(), |_| -> Result<()> {
            thread::sleep(Duration::from_millis(400));
            Err(cancelled_statement())
        })
        .expect_err("work should time out");

    assert!(error.to_string().contains("terminate_backend"), "unexpected error: {error}");
    assert_eq!(
        canceller.signals(),
        vec![
            (5, CancellationAction::CancelStatement),
            (5, CancellationAction::TerminateBackend),
        ]
    );
}

#[test]
fn successful_work_wins_even_after_a_stage_fired() {
    let mut adapter = RecordingAdapter::new();
    let canceller = RecordingCanceller::default();

    let value = MigrationTimeout::cancel_after(Duration::from_millis(10))
        .run_with(&mut adapter, canceller.clone(), |_| {
            thread::sleep(Duration::from_millis(200));
            Ok("done")
        })
        .expect("work that completes is not an error");

    assert_eq!(value, "done");
    assert_eq!(canceller.signals().len(), 1);
}
