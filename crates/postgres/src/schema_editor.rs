mod base;
mod clone;
mod hstore;
mod partitioning;
mod views;

use pgextra_core::{
    ClonePhase, DatabaseAdapter, Executor, FieldDef, ModelDef, PartitionBound, Result, SchemaEditor,
    Statement, Value,
};
use tracing::debug;

pub(crate) use self::base::index_columns_sql;
use self::{
    hstore::{SIDE_EFFECTS, SchemaSideEffect},
    partitioning::PartitionBoundClause,
};

/// PostgreSQL DDL generator.
///
/// Every call renders a unit of statements. With an adapter the unit runs
/// in its own transaction; without one it is only collected. Inside
/// [`SchemaEditor::atomic`] units are buffered and run together when the
/// outermost body returns.
pub struct PostgresSchemaEditor<'a> {
    adapter: Option<&'a mut dyn DatabaseAdapter>,
    collected: Vec<Statement>,
    pending: Option<Vec<Statement>>,
}

impl PostgresSchemaEditor<'static> {
    #[must_use]
    pub fn collecting() -> Self {
        Self {
            adapter: None,
            collected: Vec::new(),
            pending: None,
        }
    }
}

impl<'a> PostgresSchemaEditor<'a> {
    #[must_use]
    pub fn new(adapter: &'a mut dyn DatabaseAdapter) -> Self {
        Self {
            adapter: Some(adapter),
            collected: Vec::new(),
            pending: None,
        }
    }

    #[must_use]
    pub fn collected(&self) -> &[Statement] {
        &self.collected
    }

    fn emit(&mut self, statements: Vec<Statement>) -> Result<()> {
        if statements.is_empty() {
            return Ok(());
        }
        if let Some(pending) = self.pending.as_mut() {
            pending.extend(statements);
            return Ok(());
        }
        self.run(statements)
    }

    fn run(&mut self, statements: Vec<Statement>) -> Result<()> {
        if let Some(adapter) = self.adapter.as_deref_mut() {
            Executor::new(adapter).execute_atomic(&statements)?;
        } else {
            for statement in &statements {
                debug!(sql = statement.sql(), "collected statement");
            }
        }
        self.collected.extend(statements);
        Ok(())
    }

    fn side_effects(
        &self,
        hook: impl Fn(&dyn SchemaSideEffect) -> Vec<Statement>,
    ) -> Vec<Statement> {
        SIDE_EFFECTS.iter().flat_map(|effect| hook(*effect)).collect()
    }

    /// First clone phase: the table's columns, without constraints or
    /// indexes, under an ACCESS SHARE lock on the source.
    pub fn clone_model_structure_to_schema(&mut self, model: &ModelDef, schema: &str) -> Result<()> {
        self.emit(clone::clone_phase(model, schema, ClonePhase::Structure))
    }

    /// Second clone phase: primary key, constraints and indexes, under a
    /// SHARE ROW EXCLUSIVE lock so the source cannot change meanwhile.
    pub fn clone_model_constraints_and_indexes_to_schema(
        &mut self,
        model: &ModelDef,
        schema: &str,
    ) -> Result<()> {
        self.emit(clone::clone_phase(
            model,
            schema,
            ClonePhase::ConstraintsAndIndexes,
        ))
    }

    /// Third clone phase: foreign keys, added `NOT VALID` and validated
    /// afterwards.
    pub fn clone_model_foreign_keys_to_schema(&mut self, model: &ModelDef, schema: &str) -> Result<()> {
        self.emit(clone::clone_phase(model, schema, ClonePhase::ForeignKeys))
    }

    fn add_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        bound: &PartitionBoundClause<'_>,
        comment: Option<&str>,
    ) -> Result<()> {
        let statements = partitioning::add_partition(model, name, bound, comment)?;
        self.emit(statements)
    }
}

impl SchemaEditor for PostgresSchemaEditor<'_> {
    fn create_model(&mut self, model: &ModelDef) -> Result<()> {
        let mut statements = base::create_model(model);
        statements.extend(self.side_effects(|effect| effect.create_model(model)));
        self.emit(statements)
    }

    fn delete_model(&mut self, model: &ModelDef) -> Result<()> {
        let mut statements = self.side_effects(|effect| effect.delete_model(model));
        statements.push(base::delete_model(model));
        self.emit(statements)
    }

    fn add_field(&mut self, model: &ModelDef, field: &FieldDef) -> Result<()> {
        let table = model.db_table();
        let mut statements = vec![base::add_field(model, field)];
        statements.extend(self.side_effects(|effect| effect.add_field(&table, field)));
        self.emit(statements)
    }

    fn remove_field(&mut self, model: &ModelDef, field: &FieldDef) -> Result<()> {
        let table = model.db_table();
        let mut statements = self.side_effects(|effect| effect.remove_field(&table, field));
        statements.push(base::remove_field(model, field));
        self.emit(statements)
    }

    fn alter_field(
        &mut self,
        model: &ModelDef,
        old_field: &FieldDef,
        new_field: &FieldDef,
    ) -> Result<()> {
        let table = model.db_table();
        let mut statements = base::alter_field(model, old_field, new_field);
        statements.extend(self.side_effects(|effect| effect.alter_field(&table, old_field, new_field)));
        self.emit(statements)
    }

    fn alter_db_table(
        &mut self,
        model: &ModelDef,
        old_db_table: &str,
        new_db_table: &str,
    ) -> Result<()> {
        if old_db_table == new_db_table {
            return Ok(());
        }
        let mut statements = vec![base::alter_db_table(old_db_table, new_db_table)];
        statements.extend(
            self.side_effects(|effect| effect.alter_db_table(model, old_db_table, new_db_table)),
        );
        self.emit(statements)
    }

    fn create_partitioned_model(&mut self, model: &ModelDef) -> Result<()> {
        let mut statements = partitioning::create_partitioned_model(model)?;
        statements.extend(self.side_effects(|effect| effect.create_model(model)));
        self.emit(statements)
    }

    fn delete_partitioned_model(&mut self, model: &ModelDef) -> Result<()> {
        self.delete_model(model)
    }

    fn add_range_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        from_values: &[Value],
        to_values: &[Value],
        comment: Option<&str>,
    ) -> Result<()> {
        self.add_partition(
            model,
            name,
            &PartitionBoundClause::Range {
                from: from_values,
                to: to_values,
            },
            comment,
        )
    }

    fn add_list_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        values: &[Value],
        comment: Option<&str>,
    ) -> Result<()> {
        self.add_partition(model, name, &PartitionBoundClause::List(values), comment)
    }

    fn add_hash_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        modulus: u32,
        remainder: u32,
        comment: Option<&str>,
    ) -> Result<()> {
        self.add_partition(
            model,
            name,
            &PartitionBoundClause::Hash { modulus, remainder },
            comment,
        )
    }

    fn add_default_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        self.add_partition(model, name, &PartitionBoundClause::Default, comment)
    }

    fn add_sub_partition(
        &mut self,
        model: &ModelDef,
        parent: &str,
        name: &str,
        bound: &PartitionBound,
        comment: Option<&str>,
    ) -> Result<()> {
        let statements = partitioning::add_sub_partition(
            model,
            parent,
            name,
            &PartitionBoundClause::from(bound),
            comment,
        )?;
        self.emit(statements)
    }

    fn delete_partition(&mut self, model: &ModelDef, name: &str) -> Result<()> {
        self.emit(vec![partitioning::delete_partition(model, name)])
    }

    fn create_view_model(&mut self, model: &ModelDef) -> Result<()> {
        let statement = views::create_view(model, false)?;
        self.emit(vec![statement])
    }

    fn replace_view_model(&mut self, model: &ModelDef) -> Result<()> {
        let statement = views::create_view(model, true)?;
        self.emit(vec![statement])
    }

    fn delete_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.emit(vec![views::delete_view(model)])
    }

    fn create_materialized_view_model(&mut self, model: &ModelDef) -> Result<()> {
        let statement = views::create_materialized_view(model)?;
        self.emit(vec![statement])
    }

    fn delete_materialized_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.emit(vec![views::delete_materialized_view(model)])
    }

    fn replace_materialized_view_model(&mut self, model: &ModelDef) -> Result<()> {
        let statements = views::replace_materialized_view(model)?;
        self.emit(statements)
    }

    fn refresh_materialized_view_model(
        &mut self,
        model: &ModelDef,
        concurrently: bool,
    ) -> Result<()> {
        self.emit(vec![views::refresh_materialized_view(model, concurrently)])
    }

    fn atomic(
        &mut self,
        body: &mut dyn FnMut(&mut dyn SchemaEditor) -> Result<()>,
    ) -> Result<()> {
        if self.pending.is_some() {
            return body(self);
        }

        self.pending = Some(Vec::new());
        let result = body(self);
        let pending = self.pending.take().unwrap_or_default();
        result?;
        self.run(pending)
    }

    fn take_collected(&mut self) -> Vec<Statement> {
        std::mem::take(&mut self.collected)
    }
}
