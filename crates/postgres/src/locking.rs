use std::fmt;

use pgextra_core::{ModelDef, Result, Statement, Transaction};

use crate::quote::{quote_identifier, quote_qualified};

/// Table-level lock modes, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableLockMode {
    AccessShare,
    RowShare,
    RowExclusive,
    ShareUpdateExclusive,
    Share,
    ShareRowExclusive,
    Exclusive,
    AccessExclusive,
}

impl TableLockMode {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::AccessShare => "ACCESS SHARE",
            Self::RowShare => "ROW SHARE",
            Self::RowExclusive => "ROW EXCLUSIVE",
            Self::ShareUpdateExclusive => "SHARE UPDATE EXCLUSIVE",
            Self::Share => "SHARE",
            Self::ShareRowExclusive => "SHARE ROW EXCLUSIVE",
            Self::Exclusive => "EXCLUSIVE",
            Self::AccessExclusive => "ACCESS EXCLUSIVE",
        }
    }

    /// Name the lock shows up under in `pg_locks.mode`.
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::AccessShare => "AccessShareLock",
            Self::RowShare => "RowShareLock",
            Self::RowExclusive => "RowExclusiveLock",
            Self::ShareUpdateExclusive => "ShareUpdateExclusiveLock",
            Self::Share => "ShareLock",
            Self::ShareRowExclusive => "ShareRowExclusiveLock",
            Self::Exclusive => "ExclusiveLock",
            Self::AccessExclusive => "AccessExclusiveLock",
        }
    }
}

impl fmt::Display for TableLockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// `LOCK TABLE` statement. Without a schema the table resolves through
/// `search_path`.
#[must_use]
pub fn lock_table_statement(table: &str, mode: TableLockMode, schema: Option<&str>) -> Statement {
    let fqn = match schema {
        Some(schema) => quote_qualified(schema, table),
        None => quote_identifier(table),
    };
    Statement::transactional(format!("LOCK TABLE {fqn} IN {mode} MODE"))
}

/// Takes the lock inside `tx`; it is held until the transaction ends.
pub fn lock_table(
    tx: &mut Transaction<'_>,
    table: &str,
    mode: TableLockMode,
    schema: Option<&str>,
) -> Result<()> {
    tx.execute(lock_table_statement(table, mode, schema).sql())
}

pub fn lock_model(
    tx: &mut Transaction<'_>,
    model: &ModelDef,
    mode: TableLockMode,
    schema: Option<&str>,
) -> Result<()> {
    lock_table(tx, &model.db_table(), mode, schema)
}
