use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitioningMethod {
    #[default]
    Range,
    List,
    Hash,
}

impl PartitioningMethod {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Range => "RANGE",
            Self::List => "LIST",
            Self::Hash => "HASH",
        }
    }
}

impl fmt::Display for PartitioningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A CHECK constraint created on every partition individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartitionConstraint {
    pub name: String,
    pub check: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartitioningOptions {
    pub method: PartitioningMethod,
    pub key: Vec<String>,
    pub per_partition_constraints: Vec<PartitionConstraint>,
    /// When set, every partition is itself partitioned by `subkey`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submethod: Option<PartitioningMethod>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subkey: Vec<String>,
}

impl PartitioningOptions {
    pub fn new<I, S>(method: PartitioningMethod, key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            key: key.into_iter().map(Into::into).collect(),
            per_partition_constraints: Vec::new(),
            submethod: None,
            subkey: Vec::new(),
        }
    }

    pub fn range<I, S>(key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(PartitioningMethod::Range, key)
    }

    pub fn list<I, S>(key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(PartitioningMethod::List, key)
    }

    pub fn hash<I, S>(key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(PartitioningMethod::Hash, key)
    }

    #[must_use]
    pub fn with_partition_constraint(
        mut self,
        name: impl Into<String>,
        check: impl Into<String>,
    ) -> Self {
        self.per_partition_constraints.push(PartitionConstraint {
            name: name.into(),
            check: check.into(),
        });
        self
    }

    #[must_use]
    pub fn with_subpartitioning<I, S>(mut self, submethod: PartitioningMethod, subkey: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submethod = Some(submethod);
        self.subkey = subkey.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn is_subpartitioned(&self) -> bool {
        self.submethod.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewOptions {
    pub query: String,
}
