use crate::{Result, Value, Version};

const COMMIT_SQL: &str = "COMMIT";
const ROLLBACK_SQL: &str = "ROLLBACK";

/// A row returned by [`DatabaseAdapter::query`], keyed by the cursor's own
/// column descriptors rather than by any model declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl QueryRow {
    #[must_use]
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|index| self.values.get(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.columns.into_iter().zip(self.values).collect()
    }
}

pub trait DatabaseAdapter {
    fn execute(&self, sql: &str) -> Result<()>;
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<QueryRow>>;
    fn begin(&mut self) -> Result<Transaction<'_>>;
    fn backend_pid(&self) -> Result<i32>;
    fn server_version(&self) -> Result<Version>;
}

/// Rolls back on drop unless [`Transaction::commit`] was called.
pub struct Transaction<'a> {
    adapter: &'a dyn DatabaseAdapter,
    finished: bool,
}

impl<'a> Transaction<'a> {
    #[must_use]
    pub fn new(adapter: &'a dyn DatabaseAdapter) -> Self {
        Self {
            adapter,
            finished: false,
        }
    }

    pub fn execute(&mut self, sql: &str) -> Result<()> {
        self.adapter.execute(sql)
    }

    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<QueryRow>> {
        self.adapter.query(sql, params)
    }

    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.adapter.execute(COMMIT_SQL)
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.adapter.execute(ROLLBACK_SQL)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.adapter.execute(ROLLBACK_SQL);
        }
    }
}
