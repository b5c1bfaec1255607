use std::{cell::RefCell, error::Error as StdError, fmt};

use pgextra_core::{
    DatabaseAdapter, ExecutionError, QueryRow, Result, StatementContext, Transaction, Value,
    Version,
};

pub const BEGIN_SQL: &str = "BEGIN";
pub const COMMIT_SQL: &str = "COMMIT";
pub const ROLLBACK_SQL: &str = "ROLLBACK";

#[derive(Debug, Default)]
struct FailureRule {
    sql: String,
    message: String,
    context: Option<StatementContext>,
}

#[derive(Debug)]
pub struct FakeAdapter {
    state: RefCell<FakeAdapterState>,
}

#[derive(Debug)]
struct FakeAdapterState {
    server_version: Version,
    executed_sql: Vec<String>,
    query_rows: Vec<QueryRow>,
    begin_count: usize,
    commit_count: usize,
    rollback_count: usize,
    fail_on_sql: Option<FailureRule>,
}

impl Default for FakeAdapterState {
    fn default() -> Self {
        Self {
            server_version: Version {
                major: 15,
                minor: 4,
                patch: 0,
            },
            executed_sql: Vec::new(),
            query_rows: Vec::new(),
            begin_count: 0,
            commit_count: 0,
            rollback_count: 0,
            fail_on_sql: None,
        }
    }
}

impl Default for FakeAdapter {
    fn default() -> Self {
        Self {
            state: RefCell::new(FakeAdapterState::default()),
        }
    }
}

#[allow(dead_code)]
impl FakeAdapter {
    pub fn set_server_version(&self, version: Version) {
        self.state.borrow_mut().server_version = version;
    }

    pub fn set_query_rows(&self, rows: Vec<QueryRow>) {
        self.state.borrow_mut().query_rows = rows;
    }

    pub fn set_fail_on_sql(&self, sql: impl Into<String>, message: impl Into<String>) {
        self.state.borrow_mut().fail_on_sql = Some(FailureRule {
            sql: sql.into(),
            message: message.into(),
            context: None,
        });
    }

    /// Like `set_fail_on_sql`, but the adapter already knows what the
    /// statement belonged to.
    pub fn set_fail_on_sql_with_context(
        &self,
        sql: impl Into<String>,
        message: impl Into<String>,
        context: StatementContext,
    ) {
        self.state.borrow_mut().fail_on_sql = Some(FailureRule {
            sql: sql.into(),
            message: message.into(),
            context: Some(context),
        });
    }

    pub fn clear_fail_on_sql(&self) {
        self.state.borrow_mut().fail_on_sql = None;
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.state.borrow().executed_sql.clone()
    }

    pub fn begin_count(&self) -> usize {
        self.state.borrow().begin_count
    }

    pub fn commit_count(&self) -> usize {
        self.state.borrow().commit_count
    }

    pub fn rollback_count(&self) -> usize {
        self.state.borrow().rollback_count
    }
}

impl DatabaseAdapter for FakeAdapter {
    fn execute(&self, sql: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();

        if let Some(rule) = &state.fail_on_sql
            && rule.sql == sql
        {
            return Err(ExecutionError::statement_failed(
                state.executed_sql.len(),
                sql,
                state.executed_sql.len(),
                rule.context.clone(),
                FakeSourceError(rule.message.clone()),
            )
            .into());
        }

        state.executed_sql.push(sql.to_string());
        match sql {
            BEGIN_SQL => state.begin_count += 1,
            COMMIT_SQL => state.commit_count += 1,
            ROLLBACK_SQL => state.rollback_count += 1,
            _ => {}
        }

        Ok(())
    }

    fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<QueryRow>> {
        self.execute(sql)?;
        Ok(self.state.borrow().query_rows.clone())
    }

    fn begin(&mut self) -> Result<Transaction<'_>> {
        self.execute(BEGIN_SQL)?;
        Ok(Transaction::new(self))
    }

    fn backend_pid(&self) -> Result<i32> {
        Ok(1)
    }

    fn server_version(&self) -> Result<Version> {
        Ok(self.state.borrow().server_version.clone())
    }
}

#[derive(Debug)]
struct FakeSourceError(String);

impl fmt::Display for FakeSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for FakeSourceError {}
