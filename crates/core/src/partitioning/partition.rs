use super::TimePartition;
use crate::{ModelDef, PartitionBound, Result, SchemaEditor, Value};

/// Marks partitions created by the partitioning manager. Only partitions
/// carrying this comment are ever deleted by a plan.
pub const AUTO_PARTITIONED_COMMENT: &str = "psqlextra_auto_partitioned";

#[derive(Debug, Clone, PartialEq)]
pub struct RangePartition {
    pub name: String,
    pub from_values: Vec<Value>,
    pub to_values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListPartition {
    pub name: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashPartition {
    pub name: String,
    pub modulus: u32,
    pub remainder: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPartition {
    pub name: String,
}

/// A partition of the partition `parent`, for sub-partitioned models.
#[derive(Debug, Clone, PartialEq)]
pub struct SubPartition {
    pub parent: String,
    /// `{parent}_{partition name}`
    pub name: String,
    pub partition: Box<PartitionSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartitionSpec {
    Range(RangePartition),
    List(ListPartition),
    Hash(HashPartition),
    Default(DefaultPartition),
    Time(TimePartition),
    Sub(SubPartition),
}

impl PartitionSpec {
    pub fn range(
        name: impl Into<String>,
        from_values: Vec<Value>,
        to_values: Vec<Value>,
    ) -> Self {
        Self::Range(RangePartition {
            name: name.into(),
            from_values,
            to_values,
        })
    }

    pub fn list(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self::List(ListPartition {
            name: name.into(),
            values,
        })
    }

    pub fn hash(name: impl Into<String>, modulus: u32, remainder: u32) -> Self {
        Self::Hash(HashPartition {
            name: name.into(),
            modulus,
            remainder,
        })
    }

    pub fn default_partition(name: impl Into<String>) -> Self {
        Self::Default(DefaultPartition { name: name.into() })
    }

    pub fn sub(parent: impl Into<String>, partition: PartitionSpec) -> Self {
        let parent = parent.into();
        Self::Sub(SubPartition {
            name: format!("{parent}_{}", partition.name()),
            parent,
            partition: Box::new(partition),
        })
    }

    /// The `FOR VALUES` bound this partition is created with.
    #[must_use]
    pub fn bound(&self) -> PartitionBound {
        match self {
            Self::Range(partition) => PartitionBound::Range {
                from: partition.from_values.clone(),
                to: partition.to_values.clone(),
            },
            Self::List(partition) => PartitionBound::List(partition.values.clone()),
            Self::Hash(partition) => PartitionBound::Hash {
                modulus: partition.modulus,
                remainder: partition.remainder,
            },
            Self::Default(_) => PartitionBound::Default,
            Self::Time(partition) => PartitionBound::Range {
                from: partition.from_values(),
                to: partition.to_values(),
            },
            Self::Sub(partition) => partition.partition.bound(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Range(partition) => &partition.name,
            Self::List(partition) => &partition.name,
            Self::Hash(partition) => &partition.name,
            Self::Default(partition) => &partition.name,
            Self::Time(partition) => partition.name(),
            Self::Sub(partition) => &partition.name,
        }
    }

    pub fn create(
        &self,
        model: &ModelDef,
        editor: &mut dyn SchemaEditor,
        comment: Option<&str>,
    ) -> Result<()> {
        match self {
            Self::Range(partition) => editor.add_range_partition(
                model,
                &partition.name,
                &partition.from_values,
                &partition.to_values,
                comment,
            ),
            Self::List(partition) => {
                editor.add_list_partition(model, &partition.name, &partition.values, comment)
            }
            Self::Hash(partition) => editor.add_hash_partition(
                model,
                &partition.name,
                partition.modulus,
                partition.remainder,
                comment,
            ),
            Self::Default(partition) => {
                editor.add_default_partition(model, &partition.name, comment)
            }
            Self::Time(partition) => editor.add_range_partition(
                model,
                partition.name(),
                &partition.from_values(),
                &partition.to_values(),
                comment,
            ),
            Self::Sub(partition) => editor.add_sub_partition(
                model,
                &partition.parent,
                partition.partition.name(),
                &partition.partition.bound(),
                comment,
            ),
        }
    }

    pub fn delete(&self, model: &ModelDef, editor: &mut dyn SchemaEditor) -> Result<()> {
        editor.delete_partition(model, self.name())
    }

    /// Key/value pairs describing the partition, in display order.
    #[must_use]
    pub fn deconstruct(&self) -> Vec<(&'static str, String)> {
        if let Self::Sub(partition) = self {
            let mut pairs = partition.partition.deconstruct();
            if let Some(name) = pairs.first_mut() {
                name.1.clone_from(&partition.name);
            }
            pairs.insert(1, ("parent", partition.parent.clone()));
            return pairs;
        }

        let mut pairs = vec![("name", self.name().to_string())];
        match self {
            Self::Range(partition) => {
                pairs.push(("from_values", join_values(&partition.from_values)));
                pairs.push(("to_values", join_values(&partition.to_values)));
            }
            Self::List(partition) => pairs.push(("values", join_values(&partition.values))),
            Self::Hash(partition) => {
                pairs.push(("modulus", partition.modulus.to_string()));
                pairs.push(("remainder", partition.remainder.to_string()));
            }
            Self::Default(_) | Self::Sub(_) => {}
            Self::Time(partition) => {
                pairs.push(("from_values", join_values(&partition.from_values())));
                pairs.push(("to_values", join_values(&partition.to_values())));
                pairs.push(("size_unit", partition.size().unit().to_string()));
                pairs.push(("size_value", partition.size().value().to_string()));
            }
        }
        pairs
    }
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
