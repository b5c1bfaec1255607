use std::sync::Arc;

use pgextra_core::{
    Clock, DatabaseAdapter, QueryRow, Result, SystemClock, Value,
    upsert::{Returning, Row, UpsertQuery},
};
use tracing::debug;

use crate::compiler::{CompiledStatement, UpsertCompiler};

/// Runs [`UpsertQuery`] values against a live connection.
///
/// Chunked bulk upserts run inside one transaction so either every row
/// lands or none does.
pub struct Upserter<'a> {
    adapter: &'a mut dyn DatabaseAdapter,
    compiler: UpsertCompiler,
    clock: Arc<dyn Clock>,
}

impl<'a> Upserter<'a> {
    #[must_use]
    pub fn new(adapter: &'a mut dyn DatabaseAdapter) -> Self {
        Self {
            adapter,
            compiler: UpsertCompiler::default(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: UpsertCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Every returned row, keyed by the cursor's column names.
    pub fn execute(&mut self, query: &UpsertQuery) -> Result<Vec<Row>> {
        let statements = self.compiler.compile(query, self.clock.now())?;

        let rows = if let [statement] = statements.as_slice() {
            self.adapter.query(&statement.sql, &statement.params)?
        } else {
            let mut transaction = self.adapter.begin()?;
            let mut rows = Vec::new();
            for CompiledStatement { sql, params } in &statements {
                rows.extend(transaction.query(sql, params)?);
            }
            transaction.commit()?;
            rows
        };

        debug!(
            table = %query.model().db_table(),
            statements = statements.len(),
            rows = rows.len(),
            "upsert executed"
        );
        Ok(rows.into_iter().map(into_row).collect())
    }

    /// Upserts a single row and returns its primary key. `None` when
    /// `DO NOTHING` skipped the row.
    pub fn upsert(&mut self, query: &UpsertQuery) -> Result<Option<Value>> {
        let query = query.clone().returning(Returning::PrimaryKey);
        let pk_column = query.model().pk_field().map(|field| field.column().to_string());

        let row = self.execute(&query)?.into_iter().next();
        Ok(row.and_then(|mut row| match &pk_column {
            Some(column) => row.remove(column),
            None => row.into_values().next(),
        }))
    }

    /// Upserts a single row and returns it as stored.
    pub fn upsert_and_get(&mut self, query: &UpsertQuery) -> Result<Option<Row>> {
        let query = query.clone().returning(Returning::All);
        Ok(self.execute(&query)?.into_iter().next())
    }

    /// Upserts every row of `query`, returning the rows as stored.
    pub fn bulk_upsert(&mut self, query: &UpsertQuery) -> Result<Vec<Row>> {
        let query = query.clone().returning(Returning::All);
        self.execute(&query)
    }
}

fn into_row(row: QueryRow) -> Row {
    row.into_pairs().into_iter().collect()
}
