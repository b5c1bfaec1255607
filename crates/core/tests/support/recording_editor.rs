use pgextra_core::{FieldDef, ModelDef, PartitionBound, Result, SchemaEditor, Statement, Value};

/// Records every schema editor call as a readable line.
#[derive(Debug, Default)]
pub struct RecordingSchemaEditor {
    pub calls: Vec<String>,
    pub atomic_blocks: usize,
}

#[allow(dead_code)]
impl RecordingSchemaEditor {
    fn record(&mut self, call: String) -> Result<()> {
        self.calls.push(call);
        Ok(())
    }
}

fn with_comment(call: String, comment: Option<&str>) -> String {
    match comment {
        Some(comment) => format!("{call} comment={comment}"),
        None => call,
    }
}

fn values(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl SchemaEditor for RecordingSchemaEditor {
    fn create_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record(format!("create_model {}", model.db_table()))
    }

    fn delete_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record(format!("delete_model {}", model.db_table()))
    }

    fn add_field(&mut self, model: &ModelDef, field: &FieldDef) -> Result<()> {
        self.record(format!("add_field {}.{}", model.db_table(), field.column()))
    }

    fn remove_field(&mut self, model: &ModelDef, field: &FieldDef) -> Result<()> {
        self.record(format!("remove_field {}.{}", model.db_table(), field.column()))
    }

    fn alter_field(&mut self, model: &ModelDef, old_field: &FieldDef, new_field: &FieldDef) -> Result<()> {
        self.record(format!(
            "alter_field {}.{} -> {}",
            model.db_table(),
            old_field.column(),
            new_field.column()
        ))
    }

    fn alter_db_table(&mut self, _model: &ModelDef, old_db_table: &str, new_db_table: &str) -> Result<()> {
        self.record(format!("alter_db_table {old_db_table} -> {new_db_table}"))
    }

    fn create_partitioned_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record(format!("create_partitioned_model {}", model.db_table()))
    }

    fn delete_partitioned_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record(format!("delete_partitioned_model {}", model.db_table()))
    }

    fn add_range_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        from_values: &[Value],
        to_values: &[Value],
        comment: Option<&str>,
    ) -> Result<()> {
        let call = format!(
            "add_range_partition {} {name} [{}..{}]",
            model.db_table(),
            values(from_values),
            values(to_values)
        );
        self.record(with_comment(call, comment))
    }

    fn add_list_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        list: &[Value],
        comment: Option<&str>,
    ) -> Result<()> {
        let call = format!("add_list_partition {} {name} [{}]", model.db_table(), values(list));
        self.record(with_comment(call, comment))
    }

    fn add_hash_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        modulus: u32,
        remainder: u32,
        comment: Option<&str>,
    ) -> Result<()> {
        let call = format!(
            "add_hash_partition {} {name} {modulus}/{remainder}",
            model.db_table()
        );
        self.record(with_comment(call, comment))
    }

    fn add_default_partition(&mut self, model: &ModelDef, name: &str, comment: Option<&str>) -> Result<()> {
        let call = format!("add_default_partition {} {name}", model.db_table());
        self.record(with_comment(call, comment))
    }

    fn add_sub_partition(
        &mut self,
        model: &ModelDef,
        parent: &str,
        name: &str,
        bound: &PartitionBound,
        comment: Option<&str>,
    ) -> Result<()> {
        let call = format!(
            "add_sub_partition {} {parent} {name} [{}]",
            model.db_table(),
            values(&bound.values())
        );
        self.record(with_comment(call, comment))
    }

    fn delete_partition(&mut self, model: &ModelDef, name: &str) -> Result<()> {
        self.record(format!("delete_partition {} {name}", model.db_table()))
    }

    fn create_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record(format!("create_view_model {}", model.db_table()))
    }

    fn replace_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record(format!("replace_view_model {}", model.db_table()))
    }

    fn delete_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record(format!("delete_view_model {}", model.db_table()))
    }

    fn create_materialized_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record(format!("create_materialized_view_model {}", model.db_table()))
    }

    fn delete_materialized_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record(format!("delete_materialized_view_model {}", model.db_table()))
    }

    fn replace_materialized_view_model(&mut self, model: &ModelDef) -> Result<()> {
        self.record(format!("replace_materialized_view_model {}", model.db_table()))
    }

    fn refresh_materialized_view_model(&mut self, model: &ModelDef, concurrently: bool) -> Result<()> {
        self.record(format!(
            "refresh_materialized_view_model {} concurrently={concurrently}",
            model.db_table()
        ))
    }

    fn atomic(&mut self, body: &mut dyn FnMut(&mut dyn SchemaEditor) -> Result<()>) -> Result<()> {
        self.atomic_blocks += 1;
        self.calls.push("atomic {".to_string());
        let outcome = body(self);
        self.calls.push("}".to_string());
        outcome
    }

    fn take_collected(&mut self) -> Vec<Statement> {
        Vec::new()
    }
}
