use crate::{PartitioningMethod, Result, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum PartitionBound {
    Range { from: Vec<Value>, to: Vec<Value> },
    List(Vec<Value>),
    Hash { modulus: u32, remainder: u32 },
    Default,
}

impl PartitionBound {
    /// Flat bound values: FROM then TO for ranges, the list for lists,
    /// modulus then remainder for hashes.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        match self {
            Self::Range { from, to } => from.iter().chain(to).cloned().collect(),
            Self::List(values) => values.clone(),
            Self::Hash { modulus, remainder } => vec![
                Value::Integer(i64::from(*modulus)),
                Value::Integer(i64::from(*remainder)),
            ],
            Self::Default => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntrospectedPartition {
    /// Name without the `{table}_` prefix.
    pub name: String,
    pub full_name: String,
    pub bound: PartitionBound,
    pub comment: Option<String>,
}

impl IntrospectedPartition {
    #[must_use]
    pub fn bound_values(&self) -> Vec<Value> {
        self.bound.values()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntrospectedPartitionedTable {
    pub name: String,
    pub method: PartitioningMethod,
    pub key: Vec<String>,
    pub partitions: Vec<IntrospectedPartition>,
}

impl IntrospectedPartitionedTable {
    #[must_use]
    pub fn partition_by_name(&self, name: &str) -> Option<&IntrospectedPartition> {
        self.partitions
            .iter()
            .find(|partition| partition.name == name)
    }
}

/// Read-only access to live partitioning metadata.
pub trait PartitionIntrospection {
    fn get_partitioned_table(&self, table_name: &str)
    -> Result<Option<IntrospectedPartitionedTable>>;
    fn get_partitions(&self, table_name: &str) -> Result<Vec<IntrospectedPartition>>;
}
