use pgextra_core::{ConfigError, ConstraintDef, ModelDef, ModelKind, Result, Statement, ViewOptions};

use super::base::{create_indexes, field_columns, quote_columns};
use crate::quote::quote_identifier;

fn view_properties<'a>(model: &'a ModelDef, materialized: bool) -> Result<&'a ViewOptions> {
    let options = match (&model.kind, materialized) {
        (ModelKind::View(options), false) | (ModelKind::MaterializedView(options), true) => options,
        _ => {
            return Err(ConfigError::improperly_configured(
                &model.name,
                format!(
                    "Model '{}' is not properly configured to be a {}view.",
                    model.name,
                    if materialized { "materialized " } else { "" }
                ),
            )
            .into());
        }
    };

    if options.query.trim().is_empty() {
        return Err(ConfigError::improperly_configured(
            &model.name,
            format!(
                "Model '{}' is not properly configured to be a view. Set the view `query`.",
                model.name
            ),
        )
        .into());
    }
    Ok(options)
}

pub(crate) fn create_view(model: &ModelDef, replace: bool) -> Result<Statement> {
    let options = view_properties(model, false)?;
    Ok(Statement::transactional(format!(
        "CREATE {}VIEW {} AS ({})",
        if replace { "OR REPLACE " } else { "" },
        quote_identifier(&model.db_table()),
        options.query
    )))
}

pub(crate) fn delete_view(model: &ModelDef) -> Statement {
    Statement::transactional(format!(
        "DROP VIEW IF EXISTS {}",
        quote_identifier(&model.db_table())
    ))
}

pub(crate) fn create_materialized_view(model: &ModelDef) -> Result<Statement> {
    let options = view_properties(model, true)?;
    Ok(Statement::transactional(format!(
        "CREATE MATERIALIZED VIEW {} AS ({}) WITH DATA",
        quote_identifier(&model.db_table()),
        options.query
    )))
}

pub(crate) fn delete_materialized_view(model: &ModelDef) -> Statement {
    Statement::transactional(format!(
        "DROP MATERIALIZED VIEW {}",
        quote_identifier(&model.db_table())
    ))
}

pub(crate) fn refresh_materialized_view(model: &ModelDef, concurrently: bool) -> Statement {
    Statement::transactional(format!(
        "REFRESH MATERIALIZED VIEW {}{}",
        if concurrently { "CONCURRENTLY " } else { "" },
        quote_identifier(&model.db_table())
    ))
}

/// Drops and re-creates a materialized view together with its indexes.
/// Unique constraints come back as unique indexes; check constraints cannot
/// exist on a materialized view and are rejected.
pub(crate) fn replace_materialized_view(model: &ModelDef) -> Result<Vec<Statement>> {
    let table = quote_identifier(&model.db_table());
    let mut statements = vec![delete_materialized_view(model), create_materialized_view(model)?];
    statements.extend(create_indexes(model, &table));

    for constraint in &model.constraints {
        match constraint {
            ConstraintDef::Unique { name, fields } => {
                statements.push(Statement::transactional(format!(
                    "CREATE UNIQUE INDEX {} ON {table} ({})",
                    quote_identifier(name),
                    quote_columns(field_columns(model, fields))
                )));
            }
            ConstraintDef::Check { name, .. } => {
                return Err(ConfigError::improperly_configured(
                    &model.name,
                    format!(
                        "Table {} has a constraint '{name}' that no definition could be generated for",
                        model.db_table()
                    ),
                )
                .into());
            }
        }
    }
    Ok(statements)
}
