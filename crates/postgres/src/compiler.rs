use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use pgextra_core::{
    ConflictError, Expr, FieldDef, ModelDef, Result, Value,
    upsert::{ConflictAction, PreparedUpsert, ResolvedConflictTarget, ResolvedTargetColumn, Returning, UpsertQuery},
};
use tracing::debug;

use crate::{
    quote::{quote_identifier, quote_string},
    schema_editor::index_columns_sql,
};

/// Bind parameter limit of the PostgreSQL wire protocol.
pub const MAX_QUERY_PARAMS: usize = 65_535;

/// One `INSERT ... ON CONFLICT` statement and its bind parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Compiles [`UpsertQuery`] values into parameterized SQL.
#[derive(Debug, Clone, Copy)]
pub struct UpsertCompiler {
    max_params: usize,
}

impl Default for UpsertCompiler {
    fn default() -> Self {
        Self {
            max_params: MAX_QUERY_PARAMS,
        }
    }
}

impl UpsertCompiler {
    /// Lowers the per-statement parameter limit; mostly useful to exercise
    /// chunking.
    #[must_use]
    pub fn with_max_params(max_params: usize) -> Self {
        Self {
            max_params: max_params.max(1),
        }
    }

    /// Statements covering every row, in row order. Rows are split so no
    /// statement exceeds the parameter limit.
    pub fn compile(&self, query: &UpsertQuery, now: DateTime<Utc>) -> Result<Vec<CompiledStatement>> {
        let prepared = query.prepare(now)?;
        let resolved_target = query.conflict_target().resolve(prepared.model)?;
        let conflict_target = conflict_target_sql(prepared.model, &resolved_target);
        let table = quote_identifier(&prepared.model.db_table());
        let noop_column = match query.action() {
            ConflictAction::Update if prepared.fields.update_values.is_empty() => {
                Some(noop_update_column(prepared.model, &resolved_target)?)
            }
            _ => None,
        };

        let per_row = prepared.fields.insert_fields.len();
        let tail_params = [query.index_predicate_expr(), query.update_condition_expr()]
            .into_iter()
            .flatten()
            .chain(prepared.fields.update_values.iter().map(|(_, expr)| expr))
            .map(count_params)
            .sum::<usize>();
        let rows_per_statement = if per_row == 0 {
            1
        } else {
            (self.max_params.saturating_sub(tail_params) / per_row).max(1)
        };

        let statements = prepared
            .rows
            .chunks(rows_per_statement)
            .map(|rows| {
                let mut params = Vec::new();
                let mut sql = insert_sql(&table, &prepared, rows, &mut params);
                write!(sql, " ON CONFLICT {conflict_target}").expect("writing to String should not fail");

                if let Some(predicate) = query.index_predicate_expr() {
                    let mut context = ExprContext::new(prepared.model, None, &mut params);
                    write!(sql, " WHERE {}", context.render(predicate))
                        .expect("writing to String should not fail");
                }

                match query.action() {
                    ConflictAction::Nothing => sql.push_str(" DO NOTHING"),
                    ConflictAction::Update => {
                        let set = update_set_sql(&table, &prepared, noop_column, &mut params);
                        write!(sql, " DO UPDATE SET {set}").expect("writing to String should not fail");
                        if let Some(condition) = query.update_condition_expr() {
                            let mut context = ExprContext::new(prepared.model, Some(&table), &mut params);
                            write!(sql, " WHERE {}", context.render(condition))
                                .expect("writing to String should not fail");
                        }
                    }
                }

                write!(sql, " RETURNING {}", returning_sql(prepared.model, query.returning_mode()))
                    .expect("writing to String should not fail");
                CompiledStatement { sql, params }
            })
            .collect::<Vec<_>>();

        debug!(
            table = %prepared.model.db_table(),
            rows = prepared.rows.len(),
            statements = statements.len(),
            "compiled upsert"
        );
        Ok(statements)
    }
}

fn insert_sql(table: &str, prepared: &PreparedUpsert<'_>, rows: &[Vec<Value>], params: &mut Vec<Value>) -> String {
    if prepared.fields.insert_fields.is_empty() {
        return format!("INSERT INTO {table} DEFAULT VALUES");
    }

    let columns = prepared
        .fields
        .insert_fields
        .iter()
        .map(|field| quote_identifier(field.column()))
        .collect::<Vec<_>>()
        .join(", ");

    let values = rows
        .iter()
        .map(|row| {
            let placeholders = row
                .iter()
                .map(|value| {
                    params.push(value.clone());
                    format!("${}", params.len())
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("({placeholders})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {table} ({columns}) VALUES {values}")
}

fn conflict_target_sql(model: &ModelDef, target: &ResolvedConflictTarget<'_>) -> String {
    match target {
        ResolvedConflictTarget::Index(index) => format!("({})", index_columns_sql(model, index)),
        ResolvedConflictTarget::Columns(columns) => {
            let columns = columns
                .iter()
                .map(|column| match column {
                    ResolvedTargetColumn::Column(field) => quote_identifier(field.column()),
                    ResolvedTargetColumn::HStoreKey { field, key } => {
                        format!("({}->{})", quote_identifier(field.column()), quote_string(key))
                    }
                })
                .collect::<Vec<_>>();
            format!("({})", columns.join(","))
        }
    }
}

/// Column assigned to itself when a `DO UPDATE` has nothing to update, so
/// conflicting rows still come back from `RETURNING`. Prefers the primary key,
/// then the first composite key column, then the first plain conflict column.
fn noop_update_column<'m>(model: &'m ModelDef, target: &ResolvedConflictTarget<'m>) -> Result<&'m str> {
    if let Some(pk) = model.pk_field() {
        return Ok(pk.column());
    }

    let composite = model
        .primary_key
        .iter()
        .flatten()
        .find_map(|name| model.resolve_field(name));
    if let Some(field) = composite {
        return Ok(field.column());
    }

    let target_field = match target {
        ResolvedConflictTarget::Index(index) => index.fields.iter().find_map(|name| model.resolve_field(name)),
        ResolvedConflictTarget::Columns(columns) => columns.iter().find_map(|column| match column {
            ResolvedTargetColumn::Column(field) => Some(*field),
            ResolvedTargetColumn::HStoreKey { .. } => None,
        }),
    };
    target_field
        .map(FieldDef::column)
        .ok_or_else(|| {
            ConflictError::NothingToUpdate {
                table: model.db_table(),
            }
            .into()
        })
}

/// `SET` list, or `noop_column` assigned to itself when there are no update
/// values.
fn update_set_sql(
    table: &str,
    prepared: &PreparedUpsert<'_>,
    noop_column: Option<&str>,
    params: &mut Vec<Value>,
) -> String {
    if prepared.fields.update_values.is_empty()
        && let Some(column) = noop_column
    {
        let column = quote_identifier(column);
        return format!("{column} = {table}.{column}");
    }

    prepared
        .fields
        .update_values
        .iter()
        .map(|(field, expr)| {
            let mut context = ExprContext::new(prepared.model, Some(table), params);
            format!("{} = {}", quote_identifier(field.column()), context.render(expr))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn returning_sql(model: &ModelDef, returning: Returning) -> String {
    match (returning, model.pk_field()) {
        (Returning::PrimaryKey, Some(pk)) => quote_identifier(pk.column()),
        _ => "*".to_string(),
    }
}

fn count_params(expr: &Expr) -> usize {
    match expr {
        Expr::Value(_) => 1,
        Expr::Column(_) | Expr::Excluded(_) | Expr::Null | Expr::Raw(_) => 0,
        Expr::BinaryOp { left, right, .. } | Expr::Comparison { left, right, .. } => {
            count_params(left) + count_params(right)
        }
        Expr::And(left, right) | Expr::Or(left, right) => count_params(left) + count_params(right),
        Expr::Not(inner) => count_params(inner),
        Expr::Is { expr, .. } => count_params(expr),
        Expr::In { expr, list, .. } => count_params(expr) + list.iter().map(count_params).sum::<usize>(),
        Expr::Function { args, .. } => args.iter().map(count_params).sum(),
    }
}

/// Renders an [`Expr`], appending bound values to `params`.
struct ExprContext<'a> {
    model: &'a ModelDef,
    qualifier: Option<&'a str>,
    params: &'a mut Vec<Value>,
}

impl<'a> ExprContext<'a> {
    fn new(model: &'a ModelDef, qualifier: Option<&'a str>, params: &'a mut Vec<Value>) -> Self {
        Self {
            model,
            qualifier,
            params,
        }
    }

    fn column(&self, name: &str) -> String {
        let column = self
            .model
            .resolve_field(name)
            .map_or(name, FieldDef::column);
        quote_identifier(column)
    }

    fn render(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Value(Value::Null) | Expr::Null => "NULL".to_string(),
            Expr::Value(value) => {
                self.params.push(value.clone());
                format!("${}", self.params.len())
            }
            Expr::Column(name) => match self.qualifier {
                Some(table) => format!("{table}.{}", self.column(name)),
                None => self.column(name),
            },
            Expr::Excluded(name) => format!("EXCLUDED.{}", self.column(name)),
            Expr::Raw(sql) => sql.clone(),
            Expr::BinaryOp { left, op, right } => {
                format!("({} {} {})", self.render(left), op.as_sql(), self.render(right))
            }
            Expr::Comparison { left, op, right } => {
                format!("{} {} {}", self.render(left), op.as_sql(), self.render(right))
            }
            Expr::And(left, right) => format!("({} AND {})", self.render(left), self.render(right)),
            Expr::Or(left, right) => format!("({} OR {})", self.render(left), self.render(right)),
            Expr::Not(inner) => format!("NOT ({})", self.render(inner)),
            Expr::Is { expr, test } => format!("{} {}", self.render(expr), test.as_sql()),
            Expr::In { list, negated, .. } if list.is_empty() => {
                if *negated { "TRUE" } else { "FALSE" }.to_string()
            }
            Expr::In { expr, list, negated } => {
                let target = self.render(expr);
                let items = list
                    .iter()
                    .map(|item| self.render(item))
                    .collect::<Vec<_>>()
                    .join(", ");
                let not = if *negated { "NOT " } else { "" };
                format!("{target} {not}IN ({items})")
            }
            Expr::Function { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.render(arg))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{name}({args})")
            }
        }
    }
}
