use pgextra_core::{FieldDef, ModelDef, PartitionBound, Result, SchemaEditor, Statement, Value};

/// Schema editor that emits one `SELECT '<call>'` per call, so the runner's
/// SQL validation still sees parseable statements.
#[derive(Debug, Default)]
pub struct FakeSchemaEditor {
    collected: Vec<Statement>,
    emit_invalid_sql: bool,
}

#[allow(dead_code)]
impl FakeSchemaEditor {
    pub fn emitting_invalid_sql() -> Self {
        Self {
            collected: Vec::new(),
            emit_invalid_sql: true,
        }
    }

    fn record(&mut self, call: &str, model: &ModelDef, detail: Option<&str>) -> Result<()> {
        let sql = if self.emit_invalid_sql {
            format!("CREATE TABL {}", model.db_table())
        } else {
            match detail {
                Some(detail) => format!("SELECT '{call} {} {detail}'", model.db_table()),
                None => format!("SELECT '{call} {}'", model.db_table()),
            }
        };
        self.collected.push(Statement::transactional(sql));
        Ok(())
    }
}

impl SchemaEditor for FakeSchemaEditor {
    fn create_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record("create_model", model, None)
    }

    fn delete_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record("delete_model", model, None)
    }

    fn add_field(&mut self, model: &ModelDef, field: &FieldDef) -> Result<()> {
        self.record("add_field", model, Some(&field.name))
    }

    fn remove_field(&mut self, model: &ModelDef, field: &FieldDef) -> Result<()> {
        self.record("remove_field", model, Some(&field.name))
    }

    fn alter_field(&mut self, model: &ModelDef, _old_field: &FieldDef, new_field: &FieldDef) -> Result<()> {
        self.record("alter_field", model, Some(&new_field.name))
    }

    fn alter_db_table(&mut self, model: &ModelDef, _old_db_table: &str, new_db_table: &str) -> Result<()> {
        self.record("alter_db_table", model, Some(new_db_table))
    }

    fn create_partitioned_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record("create_partitioned_model", model, None)
    }

    fn delete_partitioned_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record("delete_partitioned_model", model, None)
    }

    fn add_range_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        _from_values: &[Value],
        _to_values: &[Value],
        _comment: Option<&str>,
    ) -> Result<()> {
        self.record("add_range_partition", model, Some(name))
    }

    fn add_list_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        _values: &[Value],
        _comment: Option<&str>,
    ) -> Result<()> {
        self.record("add_list_partition", model, Some(name))
    }

    fn add_hash_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        _modulus: u32,
        _remainder: u32,
        _comment: Option<&str>,
    ) -> Result<()> {
        self.record("add_hash_partition", model, Some(name))
    }

    fn add_default_partition(&mut self, model: &ModelDef, name: &str, _comment: Option<&str>) -> Result<()> {
        self.record("add_default_partition", model, Some(name))
    }

    fn add_sub_partition(
        &mut self,
        model: &ModelDef,
        parent: &str,
        name: &str,
        _bound: &PartitionBound,
        _comment: Option<&str>,
    ) -> Result<()> {
        self.record("add_sub_partition", model, Some(&format!("{parent}_{name}")))
    }

    fn delete_partition(&mut self, model: &ModelDef, name: &str) -> Result<()> {
        self.record("delete_partition", model, Some(name))
    }

    fn create_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record("create_view_model", model, None)
    }

    fn replace_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record("replace_view_model", model, None)
    }

    fn delete_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record("delete_view_model", model, None)
    }

    fn create_materialized_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record("create_materialized_view_model", model, None)
    }

    fn delete_materialized_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record("delete_materialized_view_model", model, None)
    }

    fn replace_materialized_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record("replace_materialized_view_model", model, None)
    }

    fn refresh_materialized_view_model(&mut self, model: &ModelDef, _concurrently: bool) -> Result<()> {
        self.record("refresh_materialized_view_model", model, None)
    }

    fn atomic(&mut self, body: &mut dyn FnMut(&mut dyn SchemaEditor) -> Result<()>) -> Result<()> {
        body(self)
    }

    fn take_collected(&mut self) -> Vec<Statement> {
        std::mem::take(&mut self.collected)
    }
}
