use std::{collections::BTreeMap, sync::Arc};

use super::{ModelDef, ModelKey};
use crate::{ConfigError, Result};

/// Side-table of registered models, populated once at startup and shared by
/// reference afterwards.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<ModelKey, Arc<ModelDef>>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: ModelDef) -> Result<Arc<ModelDef>> {
        let key = model.key();
        if self.models.contains_key(&key) {
            return Err(ConfigError::DuplicateModel {
                app_label: key.app_label,
                model: key.model_name,
            }
            .into());
        }

        let model = Arc::new(model);
        self.models.insert(key, Arc::clone(&model));
        Ok(model)
    }

    pub fn get(&self, app_label: &str, model_name: &str) -> Result<Arc<ModelDef>> {
        self.models
            .get(&ModelKey::new(app_label, model_name))
            .cloned()
            .ok_or_else(|| {
                ConfigError::UnknownModel {
                    app_label: app_label.to_string(),
                    model: model_name.to_string(),
                }
                .into()
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModelDef>> {
        self.models.values()
    }

    pub fn partitioned(&self) -> impl Iterator<Item = &Arc<ModelDef>> {
        self.models.values().filter(|model| model.is_partitioned())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
