use std::{fs, path::Path, sync::Arc};

use pgextra_core::{
    ConfigError, ConnectionConfig, CurrentTimePartitioningStrategy, ModelDef, ModelRegistry,
    PartitioningConfig, PartitioningManager, TimePartitionSize, TimePartitionUnit,
    partitioning::NameFormat,
};
use serde::Deserialize;

use crate::error_presentation::{CliError, CliResult};

/// Contents of the `--config` YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CliConfig {
    pub(crate) connection: ConnectionConfig,
    pub(crate) models: Vec<ModelDef>,
    pub(crate) partitioning: Vec<PartitioningEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PartitioningEntry {
    /// `app_label.ModelName`
    pub(crate) model: String,
    pub(crate) strategy: StrategyEntry,
    /// Creates the partitions of every partition of a sub-partitioned model.
    #[serde(default)]
    pub(crate) substrategy: Option<StrategyEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub(crate) enum StrategyEntry {
    CurrentTime(CurrentTimeEntry),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CurrentTimeEntry {
    pub(crate) unit: TimePartitionUnit,
    #[serde(default = "default_size")]
    pub(crate) size: u32,
    pub(crate) count: usize,
    #[serde(default)]
    pub(crate) max_age_unit: Option<TimePartitionUnit>,
    #[serde(default)]
    pub(crate) max_age: Option<u32>,
    #[serde(default)]
    pub(crate) name_format: Option<String>,
}

const fn default_size() -> u32 {
    1
}

impl CliConfig {
    pub(crate) fn load(path: &Path) -> CliResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| CliError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| CliError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Finalizes and registers every declared model.
    pub(crate) fn registry(&self) -> CliResult<ModelRegistry> {
        let mut registry = ModelRegistry::new();
        for model in &self.models {
            registry.register(model.clone().finalize()?)?;
        }
        Ok(registry)
    }

    pub(crate) fn partitioning_manager(&self, registry: &ModelRegistry) -> CliResult<PartitioningManager> {
        let mut configs = Vec::with_capacity(self.partitioning.len());
        for entry in &self.partitioning {
            configs.push(entry.config(registry)?);
        }
        Ok(PartitioningManager::new(configs)?)
    }
}

impl PartitioningEntry {
    fn config(&self, registry: &ModelRegistry) -> CliResult<PartitioningConfig> {
        let model = lookup_model(registry, &self.model)?;
        let strategy = self.strategy.build(&model)?;
        let mut config = PartitioningConfig::new(model.clone(), strategy)?;
        if let Some(substrategy) = &self.substrategy {
            config = config.with_substrategy(substrategy.build(&model)?);
        }
        Ok(config)
    }
}

impl StrategyEntry {
    fn build(&self, model: &ModelDef) -> CliResult<CurrentTimePartitioningStrategy> {
        let Self::CurrentTime(strategy) = self;

        let size = TimePartitionSize::new(strategy.unit, strategy.size)?;
        let mut built = CurrentTimePartitioningStrategy::new(size, strategy.count);
        match (strategy.max_age_unit, strategy.max_age) {
            (Some(unit), Some(value)) => built = built.with_max_age(TimePartitionSize::new(unit, value)?),
            (None, None) => {}
            _ => {
                return Err(ConfigError::improperly_configured(
                    &model.name,
                    "`max_age_unit` and `max_age` must be given together",
                )
                .into());
            }
        }
        if let Some(name_format) = &strategy.name_format {
            built = built.with_name_format(NameFormat::parse(name_format)?);
        }
        Ok(built)
    }
}

/// Resolves `app_label.ModelName` against the registry.
pub(crate) fn lookup_model(registry: &ModelRegistry, reference: &str) -> CliResult<Arc<ModelDef>> {
    let Some((app_label, model_name)) = reference.split_once('.') else {
        return Err(ConfigError::improperly_configured(
            reference,
            "model references must look like `app_label.ModelName`",
        )
        .into());
    };
    Ok(registry.get(app_label, model_name)?)
}
