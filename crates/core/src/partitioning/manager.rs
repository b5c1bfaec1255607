use std::collections::BTreeSet;

use tracing::{debug, info};

use super::{
    AUTO_PARTITIONED_COMMENT, ModelPartitioningPlan, PartitionSpec, PartitioningConfig,
    PartitioningPlan, PartitioningStrategy,
};
use crate::{
    IntrospectedPartitionedTable, ModelDef, PartitionIntrospection, PartitioningError,
    PartitioningMethod, PartitioningOptions, Result, partition_table_name,
};

/// Creates new partitions and drops expired ones according to the
/// configured strategies.
#[derive(Debug)]
pub struct PartitioningManager {
    configs: Vec<PartitioningConfig>,
}

impl PartitioningManager {
    pub fn new(configs: Vec<PartitioningConfig>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for config in &configs {
            let key = config.model().key();
            if !seen.insert(key) {
                return Err(PartitioningError::DuplicateConfig {
                    model: config.model().name.clone(),
                }
                .into());
            }
            check_substrategy(config)?;
        }

        Ok(Self { configs })
    }

    #[must_use]
    pub fn configs(&self) -> &[PartitioningConfig] {
        &self.configs
    }

    #[must_use]
    pub fn find_config_for_model(&self, model: &ModelDef) -> Option<&PartitioningConfig> {
        let key = model.key();
        self.configs
            .iter()
            .find(|config| config.model().key() == key)
    }

    /// Plans which partitions should be created and deleted.
    ///
    /// Models with nothing to do are left out of the plan.
    pub fn plan(
        &self,
        introspection: &dyn PartitionIntrospection,
        skip_create: bool,
        skip_delete: bool,
    ) -> Result<PartitioningPlan<'_>> {
        let mut model_plans = Vec::new();
        for config in &self.configs {
            let model_plan = plan_for_config(config, introspection, skip_create, skip_delete)?;
            if !model_plan.is_empty() {
                model_plans.push(model_plan);
            }
        }

        Ok(PartitioningPlan::new(model_plans))
    }
}

fn plan_for_config<'a>(
    config: &'a PartitioningConfig,
    introspection: &dyn PartitionIntrospection,
    skip_create: bool,
    skip_delete: bool,
) -> Result<ModelPartitioningPlan<'a>> {
    let model = config.model();
    let table = partitioned_table(model, introspection)?;
    let mut model_plan = ModelPartitioningPlan::new(config);

    if !skip_create {
        for partition in config.strategy().to_create() {
            let parent = partition.name().to_string();
            let exists = table.partition_by_name(&parent).is_some();
            if exists {
                debug!(model = %model.name, partition = %parent, "partition already exists");
            } else {
                model_plan.creations.push(partition);
            }

            if let Some(substrategy) = config.substrategy() {
                plan_sub_partitions(model, substrategy, &parent, exists, introspection, &mut model_plan)?;
            }
        }
    }

    if !skip_delete {
        for partition in config.strategy().to_delete() {
            let Some(introspected) = table.partition_by_name(partition.name()) else {
                debug!(model = %model.name, partition = partition.name(), "no older partitions to delete");
                break;
            };

            if introspected.comment.as_deref() != Some(AUTO_PARTITIONED_COMMENT) {
                info!(
                    model = %model.name,
                    partition = partition.name(),
                    "not deleting partition that was not created automatically"
                );
                continue;
            }

            model_plan.deletions.push(partition);
        }
    }

    Ok(model_plan)
}

/// Queues the substrategy's partitions below `parent`. Partitions of a
/// parent that already exists are only created when missing from it.
fn plan_sub_partitions(
    model: &ModelDef,
    substrategy: &dyn PartitioningStrategy,
    parent: &str,
    parent_exists: bool,
    introspection: &dyn PartitionIntrospection,
    model_plan: &mut ModelPartitioningPlan<'_>,
) -> Result<()> {
    let existing = if parent_exists {
        introspection.get_partitioned_table(&partition_table_name(&model.db_table(), parent))?
    } else {
        None
    };

    for partition in substrategy.to_create() {
        if existing
            .as_ref()
            .is_some_and(|table| table.partition_by_name(partition.name()).is_some())
        {
            debug!(
                model = %model.name,
                parent_partition = parent,
                partition = partition.name(),
                "sub-partition already exists"
            );
            continue;
        }
        model_plan.creations.push(PartitionSpec::sub(parent, partition));
    }
    Ok(())
}

fn check_substrategy(config: &PartitioningConfig) -> Result<()> {
    let model = config.model();
    let subpartitioned = model
        .partitioning()
        .is_some_and(PartitioningOptions::is_subpartitioned);

    match (subpartitioned, config.substrategy().is_some()) {
        (true, false) => Err(PartitioningError::MissingSubstrategy {
            model: model.name.clone(),
        }
        .into()),
        (false, true) => Err(PartitioningError::UnexpectedSubstrategy {
            model: model.name.clone(),
        }
        .into()),
        _ => Ok(()),
    }
}

fn partitioned_table(
    model: &ModelDef,
    introspection: &dyn PartitionIntrospection,
) -> Result<IntrospectedPartitionedTable> {
    let db_table = model.db_table();
    let table = introspection
        .get_partitioned_table(&db_table)?
        .ok_or_else(|| PartitioningError::MissingTable {
            model: model.name.clone(),
            table: db_table.clone(),
        })?;

    if table.method == PartitioningMethod::Hash {
        return Err(PartitioningError::UnsupportedMethod {
            table: db_table,
            method: table.method.to_string(),
        }
        .into());
    }

    Ok(table)
}
