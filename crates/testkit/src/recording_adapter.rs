use std::{cell::RefCell, fmt, io};

use pgextra_core::{
    DatabaseAdapter, ExecutionError, QueryRow, Result, Transaction, Value, Version,
};

const BEGIN_SQL: &str = "BEGIN";
const DEFAULT_BACKEND_PID: i32 = 4242;

/// One call made against a [`RecordingAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Adapter that records every statement and answers queries from canned
/// rows, matched by a substring of the SQL.
pub struct RecordingAdapter {
    calls: RefCell<Vec<RecordedCall>>,
    responses: Vec<(String, Vec<QueryRow>)>,
    failures: Vec<(String, String)>,
    backend_pid: i32,
    server_version: Version,
}

impl Default for RecordingAdapter {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            responses: Vec::new(),
            failures: Vec::new(),
            backend_pid: DEFAULT_BACKEND_PID,
            server_version: Version {
                major: 16,
                minor: 0,
                patch: 0,
            },
        }
    }
}

impl fmt::Debug for RecordingAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingAdapter")
            .field("calls", &self.calls.borrow().len())
            .field("responses", &self.responses.len())
            .field("failures", &self.failures.len())
            .finish()
    }
}

impl RecordingAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers queries containing `pattern` with `rows`. Earlier
    /// registrations win.
    #[must_use]
    pub fn respond(mut self, pattern: impl Into<String>, rows: Vec<QueryRow>) -> Self {
        self.responses.push((pattern.into(), rows));
        self
    }

    /// Fails any statement containing `pattern`.
    #[must_use]
    pub fn fail_on(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.push((pattern.into(), message.into()));
        self
    }

    #[must_use]
    pub fn with_backend_pid(mut self, pid: i32) -> Self {
        self.backend_pid = pid;
        self
    }

    #[must_use]
    pub fn with_server_version(mut self, version: Version) -> Self {
        self.server_version = version;
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    /// SQL of every call, in order, including `BEGIN`/`COMMIT`.
    #[must_use]
    pub fn executed_sql(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|call| call.sql.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.calls.borrow_mut().push(RecordedCall {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        match self
            .failures
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
        {
            Some((_, message)) => Err(ExecutionError::statement_failed(
                0,
                sql,
                0,
                None,
                io::Error::other(message.clone()),
            )
            .into()),
            None => Ok(()),
        }
    }
}

impl DatabaseAdapter for RecordingAdapter {
    fn execute(&self, sql: &str) -> Result<()> {
        self.record(sql, &[])
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<QueryRow>> {
        self.record(sql, params)?;
        Ok(self
            .responses
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn begin(&mut self) -> Result<Transaction<'_>> {
        self.execute(BEGIN_SQL)?;
        Ok(Transaction::new(self))
    }

    fn backend_pid(&self) -> Result<i32> {
        Ok(self.backend_pid)
    }

    fn server_version(&self) -> Result<Version> {
        Ok(self.server_version.clone())
    }
}

/// Builds a [`QueryRow`] from `(column, value)` pairs.
pub fn row<I, S>(pairs: I) -> QueryRow
where
    I: IntoIterator<Item = (S, Value)>,
    S: Into<String>,
{
    let (columns, values) = pairs
        .into_iter()
        .map(|(column, value)| (column.into(), value))
        .unzip();
    QueryRow::new(columns, values)
}
