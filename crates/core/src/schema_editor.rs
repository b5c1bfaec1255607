use crate::{FieldDef, ModelDef, PartitionBound, Result, Statement, Value};

/// DDL contract the migration operations and partitioning plans drive.
///
/// Implementations decide whether statements run immediately or are only
/// collected; `atomic` groups everything its body emits into one
/// transaction.
pub trait SchemaEditor {
    fn create_model(&mut self, model: &ModelDef) -> Result<()>;
    fn delete_model(&mut self, model: &ModelDef) -> Result<()>;
    fn add_field(&mut self, model: &ModelDef, field: &FieldDef) -> Result<()>;
    fn remove_field(&mut self, model: &ModelDef, field: &FieldDef) -> Result<()>;
    fn alter_field(&mut self, model: &ModelDef, old_field: &FieldDef, new_field: &FieldDef)
    -> Result<()>;
    fn alter_db_table(
        &mut self,
        model: &ModelDef,
        old_db_table: &str,
        new_db_table: &str,
    ) -> Result<()>;

    fn create_partitioned_model(&mut self, model: &ModelDef) -> Result<()>;
    fn delete_partitioned_model(&mut self, model: &ModelDef) -> Result<()>;
    fn add_range_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        from_values: &[Value],
        to_values: &[Value],
        comment: Option<&str>,
    ) -> Result<()>;
    fn add_list_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        values: &[Value],
        comment: Option<&str>,
    ) -> Result<()>;
    fn add_hash_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        modulus: u32,
        remainder: u32,
        comment: Option<&str>,
    ) -> Result<()>;
    fn add_default_partition(
        &mut self,
        model: &ModelDef,
        name: &str,
        comment: Option<&str>,
    ) -> Result<()>;
    /// Adds `name` below the partition `parent` of a sub-partitioned model.
    /// The table is named `{db_table}_{parent}_{name}`.
    fn add_sub_partition(
        &mut self,
        model: &ModelDef,
        parent: &str,
        name: &str,
        bound: &PartitionBound,
        comment: Option<&str>,
    ) -> Result<()>;
    fn delete_partition(&mut self, model: &ModelDef, name: &str) -> Result<()>;

    fn create_view_model(&mut self, model: &ModelDef) -> Result<()>;
    fn replace_view_model(&mut self, model: &ModelDef) -> Result<()>;
    fn delete_view_model(&mut self, model: &ModelDef) -> Result<()>;
    fn create_materialized_view_model(&mut self, model: &ModelDef) -> Result<()>;
    fn delete_materialized_view_model(&mut self, model: &ModelDef) -> Result<()>;
    /// Swaps the backing query: drop, create and re-index in one unit.
    fn replace_materialized_view_model(&mut self, model: &ModelDef) -> Result<()>;
    fn refresh_materialized_view_model(&mut self, model: &ModelDef, concurrently: bool)
    -> Result<()>;

    fn atomic(
        &mut self,
        body: &mut dyn FnMut(&mut dyn SchemaEditor) -> Result<()>,
    ) -> Result<()>;

    /// Statements emitted so far by an editor that only collects SQL.
    fn take_collected(&mut self) -> Vec<Statement>;
}

/// Partition table name: `{db_table}_{name}`, lowercased.
#[must_use]
pub fn partition_table_name(db_table: &str, name: &str) -> String {
    format!("{}_{}", db_table.to_lowercase(), name.to_lowercase())
}
