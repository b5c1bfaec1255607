use std::sync::Arc;

use super::{
    CurrentTimePartitioningStrategy, NameFormat, PartitioningStrategy, TimePartitionSize,
};
use crate::{ConfigError, ModelDef, Result};

/// Binds one partitioned model to the strategy that manages its partitions.
#[derive(Debug)]
pub struct PartitioningConfig {
    model: Arc<ModelDef>,
    strategy: Box<dyn PartitioningStrategy>,
    substrategy: Option<Box<dyn PartitioningStrategy>>,
}

impl PartitioningConfig {
    pub fn new(model: Arc<ModelDef>, strategy: impl PartitioningStrategy + 'static) -> Result<Self> {
        if !model.is_partitioned() {
            return Err(ConfigError::improperly_configured(
                &model.name,
                "only partitioned models can be given a partitioning config",
            )
            .into());
        }

        Ok(Self {
            model,
            strategy: Box::new(strategy),
            substrategy: None,
        })
    }

    /// Strategy for the partitions of every partition, used when the model
    /// declares a `submethod`.
    #[must_use]
    pub fn with_substrategy(mut self, substrategy: impl PartitioningStrategy + 'static) -> Self {
        self.substrategy = Some(Box::new(substrategy));
        self
    }

    #[must_use]
    pub fn model(&self) -> &ModelDef {
        &self.model
    }

    #[must_use]
    pub fn strategy(&self) -> &dyn PartitioningStrategy {
        self.strategy.as_ref()
    }

    #[must_use]
    pub fn substrategy(&self) -> Option<&dyn PartitioningStrategy> {
        self.substrategy.as_deref()
    }
}

/// Partitions `model` into `size` buckets, keeping `count` of them ahead of
/// the current time.
pub fn partition_by_current_time(
    model: Arc<ModelDef>,
    count: usize,
    size: TimePartitionSize,
    max_age: Option<TimePartitionSize>,
    name_format: Option<&str>,
) -> Result<PartitioningConfig> {
    let mut strategy = CurrentTimePartitioningStrategy::new(size, count);
    if let Some(max_age) = max_age {
        strategy = strategy.with_max_age(max_age);
    }
    if let Some(name_format) = name_format {
        strategy = strategy.with_name_format(NameFormat::parse(name_format)?);
    }

    PartitioningConfig::new(model, strategy)
}
