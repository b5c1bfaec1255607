use pgextra_core::{Clock, ConfigError, DatabaseAdapter, Executor, Result, Statement, Value};
use tracing::{info, warn};

use crate::{introspection_queries::SCHEMA_EXISTS_QUERY, quote::quote_identifier};

/// Identifier length limit of PostgreSQL (`NAMEDATALEN - 1`).
pub const SCHEMA_NAME_MAX_LENGTH: usize = 63;
pub const PUBLIC_SCHEMA: &str = "public";

const RANDOM_SUFFIX_FORMAT: &str = "%Y%m%d%H%M%S";

/// A named PostgreSQL schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresSchema {
    name: String,
}

impl Default for PostgresSchema {
    fn default() -> Self {
        Self::new(PUBLIC_SCHEMA)
    }
}

impl PostgresSchema {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates the schema. Fails when it already exists.
    pub fn create(adapter: &mut dyn DatabaseAdapter, name: &str) -> Result<Self> {
        if name.len() > SCHEMA_NAME_MAX_LENGTH {
            return Err(invalid(
                name,
                format!("the name is longer than the PostgreSQL limit of {SCHEMA_NAME_MAX_LENGTH} characters"),
            ));
        }

        let sql = format!("CREATE SCHEMA {}", quote_identifier(name));
        Executor::new(adapter).execute_atomic(&[Statement::transactional(sql)])?;
        info!(schema = name, "created schema");
        Ok(Self::new(name))
    }

    /// Creates `{prefix}_{timestamp}`.
    pub fn create_random(adapter: &mut dyn DatabaseAdapter, prefix: &str, clock: &dyn Clock) -> Result<Self> {
        let suffix = clock.now().format(RANDOM_SUFFIX_FORMAT);
        Self::create(adapter, &format!("{prefix}_{suffix}"))
    }

    /// Drops the schema if it exists and creates it again, in one
    /// transaction.
    pub fn delete_and_create(adapter: &mut dyn DatabaseAdapter, name: &str, cascade: bool) -> Result<Self> {
        if name.len() > SCHEMA_NAME_MAX_LENGTH {
            return Err(invalid(
                name,
                format!("the name is longer than the PostgreSQL limit of {SCHEMA_NAME_MAX_LENGTH} characters"),
            ));
        }

        let schema = Self::new(name);
        let statements = [
            schema.drop_statement(cascade)?,
            Statement::transactional(format!("CREATE SCHEMA {}", quote_identifier(name))),
        ];
        Executor::new(adapter).execute_atomic(&statements)?;
        info!(schema = name, "recreated schema");
        Ok(schema)
    }

    pub fn exists(adapter: &dyn DatabaseAdapter, name: &str) -> Result<bool> {
        let rows = adapter.query(SCHEMA_EXISTS_QUERY, &[Value::text(name)])?;
        Ok(!rows.is_empty())
    }

    /// Drops the schema. Without `cascade` PostgreSQL refuses unless the
    /// schema is empty. The `public` schema is never dropped.
    pub fn delete(&self, adapter: &mut dyn DatabaseAdapter, cascade: bool) -> Result<()> {
        let statement = self.drop_statement(cascade)?;
        Executor::new(adapter).execute_atomic(&[statement])?;
        info!(schema = %self.name, cascade, "dropped schema");
        Ok(())
    }

    /// Points unqualified names at this schema for the rest of the session.
    #[must_use]
    pub fn search_path_sql(&self) -> String {
        format!("SET search_path = {}", quote_identifier(&self.name))
    }

    fn drop_statement(&self, cascade: bool) -> Result<Statement> {
        if self.name == PUBLIC_SCHEMA {
            return Err(invalid(
                &self.name,
                "Pretty sure you are about to make a mistake by trying to drop the 'public' schema. I have stopped you. Thank me later.",
            ));
        }

        let mut sql = format!("DROP SCHEMA IF EXISTS {}", quote_identifier(&self.name));
        if cascade {
            sql.push_str(" CASCADE");
        }
        Ok(Statement::transactional(sql))
    }
}

/// Options for [`with_temporary_schema`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporarySchemaOptions {
    pub cascade: bool,
    /// Also drop the schema when `body` fails.
    pub delete_on_error: bool,
}

/// Runs `body` against a freshly created `{prefix}_{timestamp}` schema that
/// is dropped afterwards.
pub fn with_temporary_schema<T>(
    adapter: &mut dyn DatabaseAdapter,
    prefix: &str,
    clock: &dyn Clock,
    options: TemporarySchemaOptions,
    body: impl FnOnce(&mut dyn DatabaseAdapter, &PostgresSchema) -> Result<T>,
) -> Result<T> {
    let schema = PostgresSchema::create_random(adapter, prefix, clock)?;

    match body(adapter, &schema) {
        Ok(value) => {
            schema.delete(adapter, options.cascade)?;
            Ok(value)
        }
        Err(error) => {
            if options.delete_on_error
                && let Err(cleanup) = schema.delete(adapter, options.cascade)
            {
                warn!(schema = schema.name(), error = %cleanup, "failed to drop temporary schema");
            }
            Err(error)
        }
    }
}

fn invalid(schema: &str, message: impl Into<String>) -> pgextra_core::Error {
    ConfigError::InvalidSchemaOperation {
        schema: schema.to_string(),
        message: message.into(),
    }
    .into()
}
