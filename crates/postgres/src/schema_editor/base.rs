use std::fmt::Write as _;

use pgextra_core::{ConstraintDef, FieldDef, IndexDef, ModelDef, Statement};

use crate::quote::{quote_identifier, quote_literal};

/// Table and column DDL shared by plain and partitioned models.
pub(crate) fn column_definition(field: &FieldDef, with_primary_key: bool) -> String {
    let mut sql = format!("{} {}", quote_identifier(field.column()), field.data_type.sql());

    if !field.null {
        sql.push_str(" NOT NULL");
    }
    if field.primary_key && with_primary_key {
        sql.push_str(" PRIMARY KEY");
    } else if field.unique {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = &field.default {
        write!(sql, " DEFAULT {}", quote_literal(default)).expect("writing to String should not fail");
    }
    if let Some(reference) = &field.references {
        write!(
            sql,
            " REFERENCES {} ({})",
            quote_identifier(&reference.table),
            quote_identifier(&reference.column)
        )
        .expect("writing to String should not fail");
    }

    sql
}

pub(crate) fn quote_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> String {
    columns
        .into_iter()
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves field names to column names, keeping unknown names as-is.
pub(crate) fn field_columns<'a>(model: &'a ModelDef, names: &'a [String]) -> Vec<&'a str> {
    names
        .iter()
        .map(|name| {
            model
                .resolve_field(name)
                .map_or(name.as_str(), FieldDef::column)
        })
        .collect()
}

pub(crate) fn constraint_definition(model: &ModelDef, constraint: &ConstraintDef) -> String {
    match constraint {
        ConstraintDef::Check { name, check } => {
            format!("CONSTRAINT {} CHECK ({check})", quote_identifier(name))
        }
        ConstraintDef::Unique { name, fields } => format!(
            "CONSTRAINT {} UNIQUE ({})",
            quote_identifier(name),
            quote_columns(field_columns(model, fields))
        ),
    }
}

/// `CREATE TABLE` body. Single-column primary keys are dropped when
/// `primary_key` supplies a table-level one.
pub(crate) fn create_table_sql(model: &ModelDef, table: &str, primary_key: Option<&[&str]>) -> String {
    let inline_primary_key = primary_key.is_none();
    let mut parts = model
        .fields
        .iter()
        .map(|field| column_definition(field, inline_primary_key))
        .collect::<Vec<_>>();

    if let Some(columns) = primary_key {
        parts.push(format!("PRIMARY KEY ({})", quote_columns(columns.iter().copied())));
    }
    parts.extend(
        model
            .constraints
            .iter()
            .map(|constraint| constraint_definition(model, constraint)),
    );

    format!("CREATE TABLE {table} ({})", parts.join(", "))
}

/// Declared composite key, resolved to columns.
pub(crate) fn composite_primary_key(model: &ModelDef) -> Option<Vec<&str>> {
    model
        .primary_key
        .as_deref()
        .map(|names| field_columns(model, names))
}

/// Indexed columns followed by parenthesized expressions.
pub(crate) fn index_columns_sql(model: &ModelDef, index: &IndexDef) -> String {
    let mut columns = field_columns(model, &index.fields)
        .into_iter()
        .map(quote_identifier)
        .collect::<Vec<_>>();
    columns.extend(index.expressions.iter().map(|expression| format!("({expression})")));
    columns.join(", ")
}

pub(crate) fn create_index_sql(model: &ModelDef, table: &str, index: &IndexDef) -> String {
    let mut sql = format!(
        "CREATE {}INDEX {} ON {table} ({})",
        if index.unique { "UNIQUE " } else { "" },
        quote_identifier(&index.name),
        index_columns_sql(model, index)
    );
    if let Some(condition) = &index.condition {
        write!(sql, " WHERE {condition}").expect("writing to String should not fail");
    }
    sql
}

pub(crate) fn create_model(model: &ModelDef) -> Vec<Statement> {
    let table = quote_identifier(&model.db_table());
    let primary_key = composite_primary_key(model);

    let mut statements = vec![Statement::transactional(create_table_sql(
        model,
        &table,
        primary_key.as_deref(),
    ))];
    statements.extend(create_indexes(model, &table));
    statements
}

pub(crate) fn create_indexes(model: &ModelDef, table: &str) -> Vec<Statement> {
    model
        .indexes
        .iter()
        .map(|index| Statement::transactional(create_index_sql(model, table, index)))
        .collect()
}

pub(crate) fn delete_model(model: &ModelDef) -> Statement {
    Statement::transactional(format!(
        "DROP TABLE {} CASCADE",
        quote_identifier(&model.db_table())
    ))
}

pub(crate) fn add_field(model: &ModelDef, field: &FieldDef) -> Statement {
    Statement::transactional(format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_identifier(&model.db_table()),
        column_definition(field, true)
    ))
}

pub(crate) fn remove_field(model: &ModelDef, field: &FieldDef) -> Statement {
    Statement::transactional(format!(
        "ALTER TABLE {} DROP COLUMN {} CASCADE",
        quote_identifier(&model.db_table()),
        quote_identifier(field.column())
    ))
}

pub(crate) fn alter_field(model: &ModelDef, old_field: &FieldDef, new_field: &FieldDef) -> Vec<Statement> {
    let db_table = model.db_table();
    let table = quote_identifier(&db_table);
    let column = quote_identifier(new_field.column());
    let mut statements = Vec::new();
    let mut alter = |clause: String| {
        statements.push(Statement::transactional(format!("ALTER TABLE {table} {clause}")));
    };

    if old_field.column() != new_field.column() {
        alter(format!(
            "RENAME COLUMN {} TO {column}",
            quote_identifier(old_field.column())
        ));
    }
    if old_field.data_type != new_field.data_type {
        let data_type = new_field.data_type.sql();
        alter(format!(
            "ALTER COLUMN {column} TYPE {data_type} USING {column}::{data_type}"
        ));
    }
    if old_field.null != new_field.null {
        let action = if new_field.null { "DROP" } else { "SET" };
        alter(format!("ALTER COLUMN {column} {action} NOT NULL"));
    }
    if old_field.default != new_field.default {
        match &new_field.default {
            Some(default) => alter(format!(
                "ALTER COLUMN {column} SET DEFAULT {}",
                quote_literal(default)
            )),
            None => alter(format!("ALTER COLUMN {column} DROP DEFAULT")),
        }
    }
    if old_field.unique != new_field.unique && !new_field.primary_key {
        let constraint = quote_identifier(&format!("{db_table}_{}_key", new_field.column()));
        if new_field.unique {
            alter(format!("ADD CONSTRAINT {constraint} UNIQUE ({column})"));
        } else {
            alter(format!("DROP CONSTRAINT IF EXISTS {constraint}"));
        }
    }

    statements
}

pub(crate) fn alter_db_table(old_db_table: &str, new_db_table: &str) -> Statement {
    Statement::transactional(format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_identifier(old_db_table),
        quote_identifier(new_db_table)
    ))
}
