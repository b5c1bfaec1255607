use std::{error::Error as StdError, fmt, time::Duration};

use thiserror::Error;

use crate::StatementContext;

pub type BoxedSource = Box<dyn StdError + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Partitioning(#[from] PartitioningError),
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Execute(#[from] ExecutionError),
}

/// Definition-time mistakes. These are never recovered from.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("improperly configured model `{model}`: {message}")]
    ImproperlyConfigured { model: String, message: String },
    #[error("`{value}` is not a valid database backend base; expected one of: {expected}")]
    InvalidBackendBase { value: String, expected: String },
    #[error("model `{app_label}.{model}` is already registered")]
    DuplicateModel { app_label: String, model: String },
    #[error("model `{app_label}.{model}` is not registered")]
    UnknownModel { app_label: String, model: String },
    #[error("refusing to operate on schema `{schema}`: {message}")]
    InvalidSchemaOperation { schema: String, message: String },
    #[error("invalid value `{value}` for setting `{name}`: {message}")]
    InvalidSetting {
        name: String,
        value: String,
        message: String,
    },
}

impl ConfigError {
    pub fn improperly_configured(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ImproperlyConfigured {
            model: model.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PartitioningError {
    #[error("{message}")]
    InvalidSize { message: String },
    #[error(
        "Model {model}, with table {table} does not exists in the database. Did you run `migrate`?"
    )]
    MissingTable { model: String, table: String },
    #[error("table {table} is partitioned by {method}; only range and list partitioned tables can be planned")]
    UnsupportedMethod { table: String, method: String },
    #[error(
        "Table {table} is not partitioned by a range. Auto partitioning only supports partitioning by range."
    )]
    RangeOnly { table: String },
    #[error("`{format}` is not a valid partition name format")]
    InvalidNameFormat { format: String },
    #[error("Only one partitioning config per model is allowed (model `{model}`)")]
    DuplicateConfig { model: String },
    #[error(
        "Model {model} declares a submethod but its partitioning config has no substrategy to create sub-partitions with"
    )]
    MissingSubstrategy { model: String },
    #[error("Model {model} is not sub-partitioned but its partitioning config has a substrategy")]
    UnexpectedSubstrategy { model: String },
    #[error("invalid partition `{partition}` on model `{model}`: {message}")]
    InvalidPartitionState {
        model: String,
        partition: String,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum IntrospectionError {
    #[error("operational error while introspecting `{table}`: {message}")]
    Operational { table: String, message: String },
    #[error("not supported while introspecting `{table}`: {message}")]
    NotSupported { table: String, message: String },
}

/// Raised before any SQL of an upsert is executed.
#[derive(Debug, Error)]
pub enum ConflictError {
    #[error(
        "{target} is not a valid conflict target, specify a list of column names, or tuples with column names and hstore key."
    )]
    InvalidConflictTarget { target: String },
    #[error("`{field}->'{key}'` is not a valid hstore conflict target: {message}")]
    MalformedHStoreKey {
        field: String,
        key: String,
        message: String,
    },
    #[error(
        "In bulk upserts, you cannot have rows with different field configurations. Row {row} has a different field config than the first row."
    )]
    InconsistentRows { row: usize },
    #[error("upsert on `{table}` has nothing to update and no key column to assign to itself")]
    NothingToUpdate { table: String },
    #[error("upsert on `{table}` has no rows to insert")]
    EmptyRows { table: String },
    #[error("model `{model}` has no field `{field}`")]
    UnknownField { model: String, field: String },
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("no model state for `{app_label}.{model}` in project state")]
    MissingModelState { app_label: String, model: String },
    #[error("no partition state `{partition}` on `{app_label}.{model}`")]
    MissingPartitionState {
        app_label: String,
        model: String,
        partition: String,
    },
    #[error("model state `{app_label}.{model}` is not {expected}")]
    UnexpectedModelKind {
        app_label: String,
        model: String,
        expected: &'static str,
    },
    #[error("unknown migration operation `{name}`")]
    UnknownOperation { name: String },
    #[error("failed to (de)construct operation `{name}`")]
    Deconstruct {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(
        "execute statement[{statement_index}] failed after {executed_statements} executed statements (statement_context={}): {sql}",
        DisplayContext(.statement_context.as_deref())
    )]
    StatementFailed {
        statement_index: usize,
        sql: String,
        executed_statements: usize,
        statement_context: Option<Box<StatementContext>>,
        #[source]
        source: BoxedSource,
    },
    #[error("statement timed out after {elapsed:?} and was escalated to `{action}`")]
    Timeout { elapsed: Duration, action: String },
}

impl ExecutionError {
    pub fn statement_failed<E>(
        statement_index: usize,
        sql: impl Into<String>,
        executed_statements: usize,
        statement_context: Option<StatementContext>,
        source: E,
    ) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::StatementFailed {
            statement_index,
            sql: sql.into(),
            executed_statements,
            statement_context: statement_context.map(Box::new),
            source: Box::new(source),
        }
    }
}

struct DisplayContext<'a>(Option<&'a StatementContext>);

impl fmt::Display for DisplayContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(context) => write!(f, "{context}"),
            None => f.write_str("none"),
        }
    }
}
