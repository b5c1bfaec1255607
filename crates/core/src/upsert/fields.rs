use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{Row, UpsertQuery};
use crate::{ConflictError, Expr, FieldDef, ModelDef, PK_ALIAS, Result, Value};

/// Which fields an upsert inserts and which it overwrites on conflict.
///
/// Fields appear in both lists most of the time. A field with a default
/// that the caller did not supply is only inserted, so existing rows keep
/// their value.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertFields<'a> {
    pub insert_fields: Vec<&'a FieldDef>,
    pub update_values: Vec<(&'a FieldDef, Expr)>,
}

/// Splits the model's fields into insert and update sets based on the
/// first row.
pub fn infer_upsert_fields<'a>(
    model: &'a ModelDef,
    row: &Row,
    now: DateTime<Utc>,
) -> Result<UpsertFields<'a>> {
    validate_row_keys(model, row)?;

    let mut insert_fields = Vec::new();
    let mut update_values = Vec::new();
    let supplies_pk = row.contains_key(PK_ALIAS);

    for field in &model.fields {
        let excluded = || Expr::excluded(field.column());

        if row.contains_key(&field.name) || row.contains_key(field.column()) {
            insert_fields.push(field);
            update_values.push((field, excluded()));
            continue;
        }

        if field.has_default() {
            insert_fields.push(field);
            continue;
        }

        if field.primary_key && supplies_pk {
            insert_fields.push(field);
            update_values.push((field, excluded()));
            continue;
        }

        if changes_on_save(field, true, now) {
            insert_fields.push(field);
        }
        if changes_on_save(field, false, now) {
            update_values.push((field, excluded()));
        }
    }

    Ok(UpsertFields {
        insert_fields,
        update_values,
    })
}

/// Whether the field sets its own value when saved, e.g. `auto_now`.
fn changes_on_save(field: &FieldDef, add: bool, now: DateTime<Utc>) -> bool {
    field.pre_save(None, add, now).is_some()
}

/// Every row of a bulk upsert must supply the same keys as the first one.
pub fn check_row_consistency(rows: &[Row]) -> Result<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let expected: BTreeSet<&String> = first.keys().collect();

    for (index, row) in rows.iter().enumerate().skip(1) {
        if row.len() != expected.len() || !row.keys().all(|key| expected.contains(key)) {
            return Err(ConflictError::InconsistentRows { row: index }.into());
        }
    }
    Ok(())
}

fn validate_row_keys(model: &ModelDef, row: &Row) -> Result<()> {
    for key in row.keys() {
        if model.resolve_field(key).is_none() {
            return Err(ConflictError::UnknownField {
                model: model.name.clone(),
                field: key.clone(),
            }
            .into());
        }
    }
    Ok(())
}

fn row_value<'r>(field: &FieldDef, row: &'r Row) -> Option<&'r Value> {
    row.get(&field.name)
        .or_else(|| row.get(field.column()))
        .or_else(|| field.primary_key.then(|| row.get(PK_ALIAS)).flatten())
}

/// Field sets plus the concrete parameter matrix, ready for compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedUpsert<'a> {
    pub model: &'a ModelDef,
    pub fields: UpsertFields<'a>,
    /// One entry per row, ordered like `fields.insert_fields`.
    pub rows: Vec<Vec<Value>>,
}

impl UpsertQuery {
    /// Infers the field sets and computes every row's insert values.
    pub fn prepare(&self, now: DateTime<Utc>) -> Result<PreparedUpsert<'_>> {
        let model = self.model();
        let rows = self.row_values();
        let Some(first) = rows.first() else {
            return Err(ConflictError::EmptyRows {
                table: model.db_table(),
            }
            .into());
        };

        check_row_consistency(rows)?;
        let mut fields = infer_upsert_fields(model, first, now)?;

        if let Some(overrides) = self.update_values_override() {
            fields.update_values = overrides
                .iter()
                .map(|(name, expr)| {
                    model
                        .resolve_field(name)
                        .map(|field| (field, expr.clone()))
                        .ok_or_else(|| {
                            ConflictError::UnknownField {
                                model: model.name.clone(),
                                field: name.clone(),
                            }
                            .into()
                        })
                })
                .collect::<Result<Vec<_>>>()?;
        }

        let rows = rows
            .iter()
            .map(|row| {
                fields
                    .insert_fields
                    .iter()
                    .map(|field| insert_value(field, row, now))
                    .collect()
            })
            .collect();

        debug!(
            model = %model.name,
            insert_fields = fields.insert_fields.len(),
            update_fields = fields.update_values.len(),
            "prepared upsert"
        );

        Ok(PreparedUpsert {
            model,
            fields,
            rows,
        })
    }
}

fn insert_value(field: &FieldDef, row: &Row, now: DateTime<Utc>) -> Value {
    field
        .pre_save(row_value(field, row), true, now)
        .or_else(|| field.default.clone())
        .unwrap_or(Value::Null)
}
