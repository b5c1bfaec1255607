use pgextra_core::{
    DatabaseAdapter, IntrospectedPartition, IntrospectedPartitionedTable, IntrospectionError,
    PartitionIntrospection, PartitioningMethod, QueryRow, Result, Value,
};
use tracing::debug;

use crate::{bounds::parse_partition_bound, introspection_queries};

/// Reads partitioning metadata from the PostgreSQL catalogs.
pub struct PostgresIntrospection<'a> {
    adapter: &'a dyn DatabaseAdapter,
}

/// A lock currently held on a user table, as listed by `pg_locks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLock {
    pub schema: String,
    pub table: String,
    pub mode: String,
}

impl<'a> PostgresIntrospection<'a> {
    #[must_use]
    pub fn new(adapter: &'a dyn DatabaseAdapter) -> Self {
        Self { adapter }
    }

    pub fn get_partition_key(&self, table_name: &str) -> Result<Vec<String>> {
        let rows = self.adapter.query(
            introspection_queries::PARTITION_KEY_QUERY,
            &[Value::text(table_name)],
        )?;
        rows.iter()
            .map(|row| required_text(row, "column_name", table_name))
            .collect()
    }

    pub fn get_table_locks(&self) -> Result<Vec<TableLock>> {
        let rows = self
            .adapter
            .query(introspection_queries::TABLE_LOCKS_QUERY, &[])?;
        rows.iter()
            .map(|row| {
                Ok(TableLock {
                    schema: required_text(row, "schema_name", "pg_locks")?,
                    table: required_text(row, "table_name", "pg_locks")?,
                    mode: required_text(row, "lock_mode", "pg_locks")?,
                })
            })
            .collect()
    }
}

impl PartitionIntrospection for PostgresIntrospection<'_> {
    fn get_partitioned_table(
        &self,
        table_name: &str,
    ) -> Result<Option<IntrospectedPartitionedTable>> {
        let rows = self.adapter.query(
            introspection_queries::PARTITIONED_TABLE_QUERY,
            &[Value::text(table_name)],
        )?;
        let Some(row) = rows.first() else {
            debug!(table = table_name, "table is not partitioned");
            return Ok(None);
        };

        let strategy = required_text(row, "strategy", table_name)?;
        let method = partitioning_method(table_name, &strategy)?;

        Ok(Some(IntrospectedPartitionedTable {
            name: required_text(row, "table_name", table_name)?,
            method,
            key: self.get_partition_key(table_name)?,
            partitions: self.get_partitions(table_name)?,
        }))
    }

    fn get_partitions(&self, table_name: &str) -> Result<Vec<IntrospectedPartition>> {
        let rows = self.adapter.query(
            introspection_queries::PARTITIONS_QUERY,
            &[Value::text(table_name)],
        )?;
        let prefix = format!("{}_", table_name.to_lowercase());

        rows.iter()
            .map(|row| {
                let full_name = required_text(row, "table_name", table_name)?;
                let bound = required_text(row, "partition_bound", table_name)?;
                let comment = optional_text(row, "comment").filter(|comment| !comment.is_empty());

                Ok(IntrospectedPartition {
                    name: full_name
                        .strip_prefix(&prefix)
                        .unwrap_or(&full_name)
                        .to_string(),
                    bound: parse_partition_bound(table_name, &bound)?,
                    full_name,
                    comment,
                })
            })
            .collect()
    }
}

fn partitioning_method(table: &str, strategy: &str) -> Result<PartitioningMethod> {
    match strategy {
        "r" => Ok(PartitioningMethod::Range),
        "l" => Ok(PartitioningMethod::List),
        "h" => Ok(PartitioningMethod::Hash),
        other => Err(IntrospectionError::NotSupported {
            table: table.to_string(),
            message: format!("unknown partitioning strategy `{other}`"),
        }
        .into()),
    }
}

fn optional_text(row: &QueryRow, column: &str) -> Option<String> {
    match row.get(column) {
        None | Some(Value::Null) => None,
        Some(Value::Text(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn required_text(row: &QueryRow, column: &str, table: &str) -> Result<String> {
    optional_text(row, column).ok_or_else(|| {
        IntrospectionError::Operational {
            table: table.to_string(),
            message: format!("catalog row is missing `{column}`"),
        }
        .into()
    })
}
