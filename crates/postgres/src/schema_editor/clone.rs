use pgextra_core::{ClonePhase, ModelDef, Statement, StatementContext};

use super::base::{
    composite_primary_key, constraint_definition, create_index_sql, quote_columns,
};
use crate::{
    locking::{TableLockMode, lock_table_statement},
    quote::{quote_identifier, quote_qualified},
};

/// One phase of copying a table's definition into another schema. Each
/// phase runs as its own transaction, led by the lock it needs on the
/// source table.
pub(crate) fn clone_phase(model: &ModelDef, schema: &str, phase: ClonePhase) -> Vec<Statement> {
    let source = model.db_table();
    let target = quote_qualified(schema, &source);

    let (mode, body) = match phase {
        ClonePhase::Structure => (TableLockMode::AccessShare, structure(&source, &target)),
        ClonePhase::ConstraintsAndIndexes => (
            TableLockMode::ShareRowExclusive,
            constraints_and_indexes(model, &target),
        ),
        ClonePhase::ForeignKeys => (TableLockMode::RowShare, foreign_keys(model, &target)),
    };

    let context = StatementContext::CloneToSchema {
        table: source.clone(),
        schema: schema.to_string(),
        phase,
    };
    std::iter::once(lock_table_statement(&source, mode, None))
        .chain(body.into_iter().map(Statement::transactional))
        .map(|statement| statement.with_context(context.clone()))
        .collect()
}

fn structure(source: &str, target: &str) -> Vec<String> {
    vec![format!(
        "CREATE TABLE {target} (LIKE {} INCLUDING ALL EXCLUDING CONSTRAINTS EXCLUDING INDEXES)",
        quote_identifier(source)
    )]
}

fn constraints_and_indexes(model: &ModelDef, target: &str) -> Vec<String> {
    let mut statements = Vec::new();

    let primary_key = composite_primary_key(model).or_else(|| {
        model
            .pk_field()
            .map(|field| vec![field.column()])
    });
    if let Some(columns) = primary_key {
        statements.push(format!(
            "ALTER TABLE {target} ADD PRIMARY KEY ({})",
            quote_columns(columns)
        ));
    }

    statements.extend(model.fields.iter().filter(|field| field.unique && !field.primary_key).map(
        |field| {
            format!(
                "ALTER TABLE {target} ADD CONSTRAINT {} UNIQUE ({})",
                quote_identifier(&format!("{}_{}_key", model.db_table(), field.column())),
                quote_identifier(field.column())
            )
        },
    ));
    statements.extend(model.constraints.iter().map(|constraint| {
        format!(
            "ALTER TABLE {target} ADD {}",
            constraint_definition(model, constraint)
        )
    }));
    statements.extend(
        model
            .indexes
            .iter()
            .map(|index| create_index_sql(model, target, index)),
    );

    statements
}

fn foreign_keys(model: &ModelDef, target: &str) -> Vec<String> {
    let table = model.db_table();
    model
        .fields
        .iter()
        .filter_map(|field| field.references.as_ref().map(|reference| (field, reference)))
        .flat_map(|(field, reference)| {
            let name = quote_identifier(&format!("{table}_{}_fkey", field.column()));
            [
                format!(
                    "ALTER TABLE {target} ADD CONSTRAINT {name} FOREIGN KEY ({}) REFERENCES {} ({}) NOT VALID",
                    quote_identifier(field.column()),
                    quote_identifier(&reference.table),
                    quote_identifier(&reference.column)
                ),
                format!("ALTER TABLE {target} VALIDATE CONSTRAINT {name}"),
            ]
        })
        .collect()
}
