use std::{
    fmt, io,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use pgextra_core::{ConnectionConfig, DatabaseAdapter, ExecutionError, Result, Settings};
use postgres::Client;
use tracing::{debug, warn};

use crate::adapter::{connect_client, execution_error};

const WATCHDOG_THREAD_NAME: &str = "pgextra-migration-watchdog";

/// What to do to the migrating backend once a stage expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationAction {
    /// `pg_cancel_backend`: aborts the running statement.
    CancelStatement,
    /// `pg_terminate_backend`: closes the whole connection.
    TerminateBackend,
}

impl CancellationAction {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::CancelStatement => "SELECT pg_cancel_backend($1)",
            Self::TerminateBackend => "SELECT pg_terminate_backend($1)",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CancelStatement => "cancel_statement",
            Self::TerminateBackend => "terminate_backend",
        }
    }
}

impl fmt::Display for CancellationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One escalation step. `after` is measured from the start of the work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutStage {
    pub after: Duration,
    pub action: CancellationAction,
}

/// Escalation chain guarding a migration. Empty means no timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationTimeout {
    stages: Vec<TimeoutStage>,
}

impl MigrationTimeout {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cancel_after(after: Duration) -> Self {
        Self::none().stage(after, CancellationAction::CancelStatement)
    }

    #[must_use]
    pub fn terminate_after(after: Duration) -> Self {
        Self::none().stage(after, CancellationAction::TerminateBackend)
    }

    /// Adds a stage. Stages fire in order of `after`.
    #[must_use]
    pub fn stage(mut self, after: Duration, action: CancellationAction) -> Self {
        self.stages.push(TimeoutStage { after, action });
        self.stages.sort_by_key(|stage| stage.after);
        self
    }

    /// Cancels the statement after the configured default, if any.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        settings
            .migration_timeout
            .map_or_else(Self::none, Self::cancel_after)
    }

    #[must_use]
    pub fn stages(&self) -> &[TimeoutStage] {
        &self.stages
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs `work`, cancelling the adapter's backend over a side
    /// connection opened with `config` whenever a stage expires.
    pub fn run<T>(
        &self,
        adapter: &mut dyn DatabaseAdapter,
        config: &ConnectionConfig,
        work: impl FnOnce(&mut dyn DatabaseAdapter) -> Result<T>,
    ) -> Result<T> {
        self.run_with(adapter, SideConnectionCanceller::new(config.clone()), work)
    }

    /// Like [`MigrationTimeout::run`] with a caller supplied canceller.
    pub fn run_with<T, C>(
        &self,
        adapter: &mut dyn DatabaseAdapter,
        canceller: C,
        work: impl FnOnce(&mut dyn DatabaseAdapter) -> Result<T>,
    ) -> Result<T>
    where
        C: BackendCanceller + 'static,
    {
        if self.is_disabled() {
            return work(adapter);
        }

        let pid = adapter.backend_pid()?;
        let started = Instant::now();
        let (done, finished) = mpsc::channel::<()>();
        let stages = self.stages.clone();

        let watchdog = thread::Builder::new()
            .name(WATCHDOG_THREAD_NAME.to_string())
            .spawn(move || watch(pid, started, &stages, &finished, canceller))
            .map_err(|source| execution_error(WATCHDOG_THREAD_NAME, source))?;

        let outcome = work(adapter);
        let _ = done.send(());
        let fired = watchdog.join().unwrap_or_else(|_| {
            warn!(pid, "migration watchdog panicked");
            None
        });

        match (outcome, fired) {
            (Err(error), Some(action)) => {
                debug!(pid, %error, "work failed after the timeout fired");
                Err(ExecutionError::Timeout {
                    elapsed: started.elapsed(),
                    action: action.to_string(),
                }
                .into())
            }
            (outcome, _) => outcome,
        }
    }
}

/// Stops a backend from outside its own connection.
pub trait BackendCanceller: Send {
    fn cancel(&mut self, pid: i32, action: CancellationAction) -> Result<()>;
}

/// Issues the cancellation through a lazily opened second connection.
pub struct SideConnectionCanceller {
    config: ConnectionConfig,
    client: Option<Client>,
}

impl SideConnectionCanceller {
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config, client: None }
    }
}

impl BackendCanceller for SideConnectionCanceller {
    fn cancel(&mut self, pid: i32, action: CancellationAction) -> Result<()> {
        let client = match self.client.take() {
            Some(client) => client,
            None => connect_client(&self.config)?,
        };
        let client = self.client.insert(client);

        let row = client
            .query_one(action.sql(), &[&pid])
            .map_err(|source| execution_error(action.sql(), source))?;
        let signalled = row
            .try_get::<_, bool>(0)
            .map_err(|source| execution_error(action.sql(), source))?;
        if !signalled {
            return Err(execution_error(
                action.sql(),
                io::Error::other(format!("backend {pid} could not be signalled")),
            ));
        }
        Ok(())
    }
}

/// Fires stages until the work reports completion. Returns the last
/// action that was issued.
fn watch<C: BackendCanceller>(
    pid: i32,
    started: Instant,
    stages: &[TimeoutStage],
    finished: &mpsc::Receiver<()>,
    mut canceller: C,
) -> Option<CancellationAction> {
    let mut fired = None;

    for stage in stages {
        let remaining = stage.after.saturating_sub(started.elapsed());
        match finished.recv_timeout(remaining) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return fired,
            Err(RecvTimeoutError::Timeout) => {}
        }

        warn!(
            pid,
            after = ?stage.after,
            action = %stage.action,
            "migration timed out, escalating"
        );
        match canceller.cancel(pid, stage.action) {
            Ok(()) => fired = Some(stage.action),
            Err(error) => warn!(pid, action = %stage.action, %error, "failed to signal migrating backend"),
        }
    }

    fired
}
