mod auto;
mod config;
mod manager;
mod partition;
mod plan;
mod size;
mod strategy;
mod time_partition;

pub use auto::{AutoPartitionRequest, AutoPartitionUnit};
pub use config::{PartitioningConfig, partition_by_current_time};
pub use manager::PartitioningManager;
pub use partition::{
    AUTO_PARTITIONED_COMMENT, DefaultPartition, HashPartition, ListPartition, PartitionSpec,
    RangePartition, SubPartition,
};
pub use plan::{ModelPartitioningPlan, PartitioningPlan};
pub use size::{TimePartitionSize, TimePartitionUnit};
pub use strategy::{
    CurrentTimePartitioningStrategy, DeleteCondition, DeleteOnConditionPartitioningStrategy,
    ExplicitPartitioningStrategy, PartitionIter, PartitioningStrategy,
};
pub use time_partition::{NameFormat, TimePartition};
