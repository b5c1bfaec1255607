use tracing::debug;

use crate::{DatabaseAdapter, Error, ExecutionError, Result, Statement, Transaction};

/// Runs statements in order, grouping consecutive transactional statements
/// into one transaction.
pub struct Executor<'a> {
    adapter: &'a mut dyn DatabaseAdapter,
}

impl<'a> Executor<'a> {
    #[must_use]
    pub fn new(adapter: &'a mut dyn DatabaseAdapter) -> Self {
        Self { adapter }
    }

    pub fn execute_plan(&mut self, statements: &[Statement]) -> Result<()> {
        let mut index = 0;
        while index < statements.len() {
            index = self.execute_next_group(statements, index)?;
        }

        Ok(())
    }

    /// Runs every statement inside a single transaction regardless of the
    /// statements' own transactional flag.
    pub fn execute_atomic(&mut self, statements: &[Statement]) -> Result<()> {
        if statements.is_empty() {
            return Ok(());
        }

        let mut tx = self.adapter.begin()?;
        for (index, statement) in statements.iter().enumerate() {
            execute_in_transaction(&mut tx, index, statement)?;
        }
        tx.commit()
    }

    fn execute_next_group(&mut self, statements: &[Statement], start: usize) -> Result<usize> {
        match &statements[start] {
            Statement::Sql {
                transactional: true,
                ..
            } => self.execute_transactional_group(statements, start),
            Statement::Sql {
                transactional: false,
                ..
            } => self.execute_non_transactional_statement(statements, start),
        }
    }

    fn execute_transactional_group(
        &mut self,
        statements: &[Statement],
        start: usize,
    ) -> Result<usize> {
        let mut tx = self.adapter.begin()?;
        let mut cursor = start;

        while let Some(statement) = statements.get(cursor) {
            match statement {
                Statement::Sql {
                    transactional: true,
                    ..
                } => {
                    execute_in_transaction(&mut tx, cursor, statement)?;
                    cursor += 1;
                }
                Statement::Sql {
                    transactional: false,
                    ..
                } => break,
            }
        }

        tx.commit()?;
        Ok(cursor)
    }

    fn execute_non_transactional_statement(
        &mut self,
        statements: &[Statement],
        start: usize,
    ) -> Result<usize> {
        let statement = &statements[start];
        debug!(sql = statement.sql(), "executing statement");
        self.adapter
            .execute(statement.sql())
            .map_err(|error| with_statement_position(error, start, statement))?;
        Ok(start + 1)
    }
}

fn execute_in_transaction(
    tx: &mut Transaction<'_>,
    index: usize,
    statement: &Statement,
) -> Result<()> {
    debug!(sql = statement.sql(), "executing statement in transaction");
    tx.execute(statement.sql())
        .map_err(|error| with_statement_position(error, index, statement))
}

fn with_statement_position(error: Error, index: usize, statement: &Statement) -> Error {
    let Statement::Sql { context, .. } = statement;
    match error {
        Error::Execute(ExecutionError::StatementFailed {
            sql,
            statement_context,
            source,
            ..
        }) => ExecutionError::StatementFailed {
            statement_index: index,
            sql,
            executed_statements: index,
            statement_context: statement_context.or_else(|| context.clone().map(Box::new)),
            source,
        }
        .into(),
        other => other,
    }
}
