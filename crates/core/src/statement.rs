use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Sql {
        sql: String,
        transactional: bool,
        context: Option<StatementContext>,
    },
}

impl Statement {
    pub fn transactional(sql: impl Into<String>) -> Self {
        Self::Sql {
            sql: sql.into(),
            transactional: true,
            context: None,
        }
    }

    pub fn non_transactional(sql: impl Into<String>) -> Self {
        Self::Sql {
            sql: sql.into(),
            transactional: false,
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(self, context: StatementContext) -> Self {
        match self {
            Self::Sql {
                sql, transactional, ..
            } => Self::Sql {
                sql,
                transactional,
                context: Some(context),
            },
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        match self {
            Self::Sql { sql, .. } => sql,
        }
    }
}

/// What a statement belongs to, carried into execution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementContext {
    Partition { table: String, partition: String },
    CloneToSchema { table: String, schema: String, phase: ClonePhase },
    HStoreSideEffect { table: String, column: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClonePhase {
    Structure,
    ConstraintsAndIndexes,
    ForeignKeys,
}

impl fmt::Display for StatementContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partition { table, partition } => {
                write!(f, "partition {partition} of {table}")
            }
            Self::CloneToSchema {
                table,
                schema,
                phase,
            } => write!(f, "clone of {table} into {schema} ({phase:?})"),
            Self::HStoreSideEffect { table, column } => {
                write!(f, "hstore constraints on {table}.{column}")
            }
        }
    }
}
