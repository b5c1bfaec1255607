use std::fmt::Write as _;

use pgextra_core::{
    ConfigError, ModelDef, PartitionBound, PartitioningOptions, Result, Statement, StatementContext,
    Value, partition_table_name,
};

use super::base::{composite_primary_key, create_indexes, create_table_sql, quote_columns};
use crate::quote::{quote_identifier, quote_literals, quote_string};

/// Partitioning options of `model`, with every key field checked.
pub(crate) fn partitioning_properties(model: &ModelDef) -> Result<&PartitioningOptions> {
    let not_configured = |detail: String| {
        ConfigError::improperly_configured(
            &model.name,
            format!("Model '{}' is not properly configured to be partitioned. {detail}", model.name),
        )
    };

    let Some(options) = model.partitioning() else {
        return Err(not_configured(format!(
            "Declare partitioning options when building '{}'.",
            model.name
        ))
        .into());
    };
    if options.key.is_empty() {
        return Err(not_configured("Set the partitioning `key`.".to_string()).into());
    }
    if let Some(missing) = options.key.iter().find(|name| model.resolve_field(name).is_none()) {
        return Err(not_configured(format!(
            "Field '{missing}' in partitioning key {:?} is not a valid field on '{}'.",
            options.key, model.name
        ))
        .into());
    }

    if options.submethod.is_some() {
        if options.subkey.is_empty() {
            return Err(not_configured("Set the sub-partitioning `subkey`.".to_string()).into());
        }
        if let Some(missing) = options.subkey.iter().find(|name| model.resolve_field(name).is_none()) {
            return Err(not_configured(format!(
                "Field '{missing}' in sub-partitioning key {:?} is not a valid field on '{}'.",
                options.subkey, model.name
            ))
            .into());
        }
    }

    Ok(options)
}

fn key_columns<'a>(model: &'a ModelDef, key: &'a [String]) -> Vec<&'a str> {
    key.iter()
        .filter_map(|name| model.resolve_field(name).map(|field| field.column()))
        .collect()
}

/// `CREATE TABLE ... PARTITION BY` with the key folded into the primary key.
pub(crate) fn create_partitioned_model(model: &ModelDef) -> Result<Vec<Statement>> {
    let options = partitioning_properties(model)?;
    let key = key_columns(model, &options.key);
    let table = quote_identifier(&model.db_table());

    let primary_key = match composite_primary_key(model) {
        Some(columns) => columns,
        None => {
            let mut columns = Vec::with_capacity(key.len() + 1);
            if let Some(pk) = model.pk_field()
                && !key.contains(&pk.column())
            {
                columns.push(pk.column());
            }
            columns.extend(key.iter().copied());
            columns
        }
    };

    let sql = format!(
        "{} PARTITION BY {} ({})",
        create_table_sql(model, &table, Some(&primary_key)),
        options.method.as_sql(),
        quote_columns(key.iter().copied())
    );

    let mut statements = vec![Statement::transactional(sql)];
    statements.extend(create_indexes(model, &table));
    Ok(statements)
}

/// Which `FOR VALUES` clause a new partition gets.
pub(crate) enum PartitionBoundClause<'a> {
    Range { from: &'a [Value], to: &'a [Value] },
    List(&'a [Value]),
    Hash { modulus: u32, remainder: u32 },
    Default,
}

impl<'a> From<&'a PartitionBound> for PartitionBoundClause<'a> {
    fn from(bound: &'a PartitionBound) -> Self {
        match bound {
            PartitionBound::Range { from, to } => Self::Range { from, to },
            PartitionBound::List(values) => Self::List(values),
            PartitionBound::Hash { modulus, remainder } => Self::Hash {
                modulus: *modulus,
                remainder: *remainder,
            },
            PartitionBound::Default => Self::Default,
        }
    }
}

impl PartitionBoundClause<'_> {
    fn sql(&self) -> String {
        match self {
            Self::Range { from, to } => format!(
                "FOR VALUES FROM ({}) TO ({})",
                quote_literals(from),
                quote_literals(to)
            ),
            Self::List(values) => format!("FOR VALUES IN ({})", quote_literals(values)),
            Self::Hash { modulus, remainder } => {
                format!("FOR VALUES WITH (MODULUS {modulus}, REMAINDER {remainder})")
            }
            Self::Default => "DEFAULT".to_string(),
        }
    }
}

/// The partition table, its per-partition constraints and its comment.
/// Callers run these as one unit.
pub(crate) fn add_partition(
    model: &ModelDef,
    name: &str,
    bound: &PartitionBoundClause<'_>,
    comment: Option<&str>,
) -> Result<Vec<Statement>> {
    let options = partitioning_properties(model)?;
    let db_table = model.db_table();
    let partition = partition_table_name(&db_table, name);
    let context = StatementContext::Partition {
        table: db_table.clone(),
        partition: partition.clone(),
    };
    let quoted_partition = quote_identifier(&partition);

    let mut create = format!(
        "CREATE TABLE {quoted_partition} PARTITION OF {} {}",
        quote_identifier(&db_table),
        bound.sql()
    );
    if let Some(submethod) = options.submethod {
        write!(
            create,
            " PARTITION BY {} ({})",
            submethod.as_sql(),
            quote_columns(key_columns(model, &options.subkey))
        )
        .expect("writing to String should not fail");
    }

    let mut statements = vec![create];
    statements.extend(options.per_partition_constraints.iter().map(|constraint| {
        format!(
            "ALTER TABLE {quoted_partition} ADD CONSTRAINT {} CHECK ({})",
            quote_identifier(&format!("{partition}_{}", constraint.name)),
            constraint.check
        )
    }));
    if let Some(comment) = comment {
        statements.push(format!(
            "COMMENT ON TABLE {quoted_partition} IS {}",
            quote_string(comment)
        ));
    }

    Ok(statements
        .into_iter()
        .map(|sql| Statement::transactional(sql).with_context(context.clone()))
        .collect())
}

/// A partition of the partition `parent`. Per-partition constraints are
/// inherited from the parent, so only the table and its comment are created.
pub(crate) fn add_sub_partition(
    model: &ModelDef,
    parent: &str,
    name: &str,
    bound: &PartitionBoundClause<'_>,
    comment: Option<&str>,
) -> Result<Vec<Statement>> {
    let options = partitioning_properties(model)?;
    if options.submethod.is_none() {
        return Err(ConfigError::improperly_configured(
            &model.name,
            format!(
                "Model '{}' is not sub-partitioned. Set the partitioning `submethod` and `subkey`.",
                model.name
            ),
        )
        .into());
    }

    let parent_table = partition_table_name(&model.db_table(), parent);
    let partition = partition_table_name(&parent_table, name);
    let context = StatementContext::Partition {
        table: parent_table.clone(),
        partition: partition.clone(),
    };
    let quoted_partition = quote_identifier(&partition);

    let mut statements = vec![format!(
        "CREATE TABLE {quoted_partition} PARTITION OF {} {}",
        quote_identifier(&parent_table),
        bound.sql()
    )];
    if let Some(comment) = comment {
        statements.push(format!(
            "COMMENT ON TABLE {quoted_partition} IS {}",
            quote_string(comment)
        ));
    }

    Ok(statements
        .into_iter()
        .map(|sql| Statement::transactional(sql).with_context(context.clone()))
        .collect())
}

pub(crate) fn delete_partition(model: &ModelDef, name: &str) -> Statement {
    let db_table = model.db_table();
    let partition = partition_table_name(&db_table, name);
    Statement::transactional(format!("DROP TABLE {}", quote_identifier(&partition))).with_context(
        StatementContext::Partition {
            table: db_table,
            partition,
        },
    )
}
