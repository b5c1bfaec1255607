use std::{fmt, sync::Arc};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ExplicitPartitioningStrategy, PartitionSpec, PartitioningConfig, TimePartition, TimePartitionSize};
use crate::{ModelDef, PartitionIntrospection, PartitioningError, PartitioningMethod, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoPartitionUnit {
    #[default]
    Month,
    Week,
}

impl AutoPartitionUnit {
    fn size(self, interval: u32) -> Result<TimePartitionSize> {
        match self {
            Self::Month => TimePartitionSize::months(interval),
            Self::Week => TimePartitionSize::weeks(interval),
        }
    }
}

impl fmt::Display for AutoPartitionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Month => "month",
            Self::Week => "week",
        })
    }
}

/// Ahead-of-time partitioning request for one range partitioned model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoPartitionRequest {
    pub count: usize,
    pub unit: AutoPartitionUnit,
    pub interval: u32,
    /// Intervals starting before this date are not created.
    pub start_from: Option<NaiveDate>,
}

impl Default for AutoPartitionRequest {
    fn default() -> Self {
        Self {
            count: 1,
            unit: AutoPartitionUnit::Month,
            interval: 1,
            start_from: None,
        }
    }
}

impl AutoPartitionRequest {
    /// `count` consecutive intervals, the first one starting at the
    /// beginning of the month or week `now` falls into.
    pub fn intervals(&self, now: NaiveDateTime) -> Result<Vec<TimePartition>> {
        let size = self.unit.size(self.interval)?;
        let mut start = self.unit.size(1)?.start(now);
        let mut partitions = Vec::with_capacity(self.count);

        for _ in 0..self.count {
            let partition = TimePartition::new(size, start, None);
            start = partition.end();

            if let Some(start_from) = self.start_from
                && partition.start().date() < start_from
            {
                info!(
                    partition = partition.name(),
                    start_from = %start_from,
                    "skipping partition that starts before the requested date"
                );
                continue;
            }
            partitions.push(partition);
        }

        Ok(partitions)
    }

    /// Builds a config whose plan creates the missing intervals and never
    /// deletes anything. Only range partitioned tables qualify.
    pub fn config(
        &self,
        model: Arc<ModelDef>,
        introspection: &dyn PartitionIntrospection,
        now: NaiveDateTime,
    ) -> Result<PartitioningConfig> {
        let db_table = model.db_table();
        let table = introspection
            .get_partitioned_table(&db_table)?
            .ok_or_else(|| PartitioningError::MissingTable {
                model: model.name.clone(),
                table: db_table.clone(),
            })?;

        if table.method != PartitioningMethod::Range {
            return Err(PartitioningError::RangeOnly { table: table.name }.into());
        }

        let creations = self
            .intervals(now)?
            .into_iter()
            .map(PartitionSpec::Time)
            .collect();

        PartitioningConfig::new(model, ExplicitPartitioningStrategy::new(creations, Vec::new()))
    }
}
