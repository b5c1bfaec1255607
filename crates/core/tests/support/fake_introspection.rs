use std::{cell::RefCell, collections::BTreeMap};

use pgextra_core::{
    AUTO_PARTITIONED_COMMENT, IntrospectedPartition, IntrospectedPartitionedTable, PartitionBound,
    PartitionIntrospection, PartitionSpec, PartitioningMethod, PartitioningPlan, Result,
    partition_table_name,
};

/// Catalog double: partitioned tables live in memory and applied plans can
/// be folded back in.
#[derive(Debug, Default)]
pub struct FakeIntrospection {
    tables: RefCell<BTreeMap<String, IntrospectedPartitionedTable>>,
}

#[allow(dead_code)]
impl FakeIntrospection {
    pub fn with_table(self, name: &str, method: PartitioningMethod, key: &[&str]) -> Self {
        self.insert_table(name, method, key);
        self
    }

    pub fn insert_table(&self, name: &str, method: PartitioningMethod, key: &[&str]) {
        self.tables.borrow_mut().insert(
            name.to_string(),
            IntrospectedPartitionedTable {
                name: name.to_string(),
                method,
                key: key.iter().map(|column| (*column).to_string()).collect(),
                partitions: Vec::new(),
            },
        );
    }

    pub fn with_partition(self, table: &str, name: &str, comment: Option<&str>) -> Self {
        self.add_partition(table, name, comment);
        self
    }

    pub fn add_partition(&self, table: &str, name: &str, comment: Option<&str>) {
        let mut tables = self.tables.borrow_mut();
        let Some(table) = tables.get_mut(table) else {
            panic!("table `{table}` is not known to the fake catalog");
        };
        table.partitions.push(IntrospectedPartition {
            name: name.to_string(),
            full_name: format!("{}_{name}", table.name),
            bound: PartitionBound::Default,
            comment: comment.map(ToString::to_string),
        });
    }

    pub fn remove_partition(&self, table: &str, name: &str) {
        if let Some(table) = self.tables.borrow_mut().get_mut(table) {
            table.partitions.retain(|partition| partition.name != name);
        }
    }

    /// Mirrors what applying `plan` would leave in the catalog. Partitions
    /// of a sub-partitioned model become partitioned tables themselves.
    pub fn apply(&self, plan: &PartitioningPlan<'_>) {
        for model_plan in &plan.model_plans {
            let model = model_plan.config.model();
            let table = model.db_table();
            for partition in &model_plan.creations {
                if let PartitionSpec::Sub(sub) = partition {
                    let parent = partition_table_name(&table, &sub.parent);
                    self.add_partition(&parent, sub.partition.name(), Some(AUTO_PARTITIONED_COMMENT));
                    continue;
                }

                self.add_partition(&table, partition.name(), Some(AUTO_PARTITIONED_COMMENT));
                if let Some(options) = model.partitioning()
                    && let Some(submethod) = options.submethod
                {
                    let subkey = options.subkey.iter().map(String::as_str).collect::<Vec<_>>();
                    self.insert_table(&partition_table_name(&table, partition.name()), submethod, &subkey);
                }
            }
            for partition in &model_plan.deletions {
                self.remove_partition(&table, partition.name());
            }
        }
    }

    pub fn partition_names(&self, table: &str) -> Vec<String> {
        self.tables
            .borrow()
            .get(table)
            .map(|table| {
                table
                    .partitions
                    .iter()
                    .map(|partition| partition.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl PartitionIntrospection for FakeIntrospection {
    fn get_partitioned_table(&self, table_name: &str) -> Result<Option<IntrospectedPartitionedTable>> {
        Ok(self.tables.borrow().get(table_name).cloned())
    }

    fn get_partitions(&self, table_name: &str) -> Result<Vec<IntrospectedPartition>> {
        Ok(self
            .tables
            .borrow()
            .get(table_name)
            .map(|table| table.partitions.clone())
            .unwrap_or_default())
    }
}
