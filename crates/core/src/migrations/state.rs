use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    ConstraintDef, FieldDef, IndexDef, MigrationError, ModelDef, ModelKey, ModelKind,
    PartitioningError, PartitioningMethod, PartitioningOptions, Result, Value, ViewOptions,
};

/// A partition as recorded by the migrations that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionState {
    Range {
        app_label: String,
        model_name: String,
        name: String,
        from_values: Vec<Value>,
        to_values: Vec<Value>,
    },
    List {
        app_label: String,
        model_name: String,
        name: String,
        values: Vec<Value>,
    },
    Hash {
        app_label: String,
        model_name: String,
        name: String,
        modulus: u32,
        remainder: u32,
    },
    Default {
        app_label: String,
        model_name: String,
        name: String,
    },
}

impl PartitionState {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Range { name, .. }
            | Self::List { name, .. }
            | Self::Hash { name, .. }
            | Self::Default { name, .. } => name,
        }
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        match self {
            Self::Range { model_name, .. }
            | Self::List { model_name, .. }
            | Self::Hash { model_name, .. }
            | Self::Default { model_name, .. } => model_name,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Range { .. } => "range",
            Self::List { .. } => "list",
            Self::Hash { .. } => "hash",
            Self::Default { .. } => "default",
        }
    }

    #[must_use]
    pub const fn is_default(&self) -> bool {
        matches!(self, Self::Default { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartitionedModelState {
    pub partitions: BTreeMap<String, PartitionState>,
    pub partitioning_options: PartitioningOptions,
}

impl PartitionedModelState {
    #[must_use]
    pub fn new(partitioning_options: PartitioningOptions) -> Self {
        Self {
            partitions: BTreeMap::new(),
            partitioning_options,
        }
    }

    /// Records a partition, replacing one with the same name.
    ///
    /// Hash partitioned tables cannot have a default partition and other
    /// tables can have at most one.
    pub fn add_partition(&mut self, partition: PartitionState) -> Result<()> {
        if partition.is_default() {
            let invalid = |message: &str| PartitioningError::InvalidPartitionState {
                model: partition.model_name().to_string(),
                partition: partition.name().to_string(),
                message: message.to_string(),
            };

            if self.partitioning_options.method == PartitioningMethod::Hash {
                return Err(invalid("hash partitioned tables cannot have a default partition").into());
            }
            let existing_default = self
                .partitions
                .values()
                .find(|existing| existing.is_default() && existing.name() != partition.name());
            if existing_default.is_some() {
                return Err(invalid("a default partition already exists").into());
            }
        }

        self.partitions
            .insert(partition.name().to_string(), partition);
        Ok(())
    }

    pub fn delete_partition(&mut self, name: &str) -> Option<PartitionState> {
        self.partitions.remove(name)
    }

    #[must_use]
    pub fn partition(&self, name: &str) -> Option<&PartitionState> {
        self.partitions.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_table: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModelStateKind {
    #[default]
    Plain,
    Partitioned(PartitionedModelState),
    View(ViewOptions),
    MaterializedView(ViewOptions),
}

impl ModelStateKind {
    #[must_use]
    pub const fn is_view(&self) -> bool {
        matches!(self, Self::View(_) | Self::MaterializedView(_))
    }
}

/// Migration-time shape of one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelState {
    pub app_label: String,
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub options: ModelOptions,
    pub kind: ModelStateKind,
}

impl ModelState {
    pub fn new(
        app_label: impl Into<String>,
        name: impl Into<String>,
        fields: Vec<FieldDef>,
        options: ModelOptions,
        kind: ModelStateKind,
    ) -> Self {
        Self {
            app_label: app_label.into(),
            name: name.into(),
            fields,
            options,
            kind,
        }
    }

    /// Captures a model definition. Partitioned models start without any
    /// recorded partitions.
    #[must_use]
    pub fn from_model(model: &ModelDef) -> Self {
        let kind = match &model.kind {
            ModelKind::Plain => ModelStateKind::Plain,
            ModelKind::Partitioned(options) => {
                ModelStateKind::Partitioned(PartitionedModelState::new(options.clone()))
            }
            ModelKind::View(options) => ModelStateKind::View(options.clone()),
            ModelKind::MaterializedView(options) => {
                ModelStateKind::MaterializedView(options.clone())
            }
        };

        Self {
            app_label: model.app_label.clone(),
            name: model.name.clone(),
            fields: model.fields.clone(),
            options: ModelOptions {
                db_table: model.db_table.clone(),
                indexes: model.indexes.clone(),
                constraints: model.constraints.clone(),
                primary_key: model.primary_key.clone(),
            },
            kind,
        }
    }

    #[must_use]
    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.app_label.clone(), &self.name)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Builds the model definition the schema editor works from.
    #[must_use]
    pub fn render(&self) -> ModelDef {
        let kind = match &self.kind {
            ModelStateKind::Plain => ModelKind::Plain,
            ModelStateKind::Partitioned(state) => {
                ModelKind::Partitioned(state.partitioning_options.clone())
            }
            ModelStateKind::View(options) => ModelKind::View(options.clone()),
            ModelStateKind::MaterializedView(options) => ModelKind::MaterializedView(options.clone()),
        };

        ModelDef {
            app_label: self.app_label.clone(),
            name: self.name.clone(),
            db_table: self.options.db_table.clone(),
            fields: self.fields.clone(),
            indexes: self.options.indexes.clone(),
            constraints: self.options.constraints.clone(),
            primary_key: self.options.primary_key.clone(),
            kind,
        }
    }

    #[must_use]
    pub fn partitioned(&self) -> Option<&PartitionedModelState> {
        match &self.kind {
            ModelStateKind::Partitioned(state) => Some(state),
            _ => None,
        }
    }

    pub fn partitioned_mut(&mut self) -> Option<&mut PartitionedModelState> {
        match &mut self.kind {
            ModelStateKind::Partitioned(state) => Some(state),
            _ => None,
        }
    }
}

/// Every model known to the migrations at one point in history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectState {
    pub models: BTreeMap<ModelKey, ModelState>,
}

impl ProjectState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_models<'a>(models: impl IntoIterator<Item = &'a ModelDef>) -> Self {
        let mut state = Self::new();
        for model in models {
            state.add_model(ModelState::from_model(model));
        }
        state
    }

    pub fn add_model(&mut self, model: ModelState) {
        self.models.insert(model.key(), model);
    }

    #[must_use]
    pub fn get_model(&self, app_label: &str, model_name: &str) -> Option<&ModelState> {
        self.models.get(&ModelKey::new(app_label, model_name))
    }

    pub fn get_model_mut(&mut self, app_label: &str, model_name: &str) -> Option<&mut ModelState> {
        self.models.get_mut(&ModelKey::new(app_label, model_name))
    }

    pub fn remove_model(&mut self, app_label: &str, model_name: &str) -> Option<ModelState> {
        self.models.remove(&ModelKey::new(app_label, model_name))
    }

    pub fn require_model(&self, app_label: &str, model_name: &str) -> Result<&ModelState> {
        self.get_model(app_label, model_name)
            .ok_or_else(|| missing_model(app_label, model_name))
    }

    pub fn require_model_mut(&mut self, app_label: &str, model_name: &str) -> Result<&mut ModelState> {
        self.get_model_mut(app_label, model_name)
            .ok_or_else(|| missing_model(app_label, model_name))
    }

    pub fn partitioned_model_mut(
        &mut self,
        app_label: &str,
        model_name: &str,
    ) -> Result<&mut PartitionedModelState> {
        self.require_model_mut(app_label, model_name)?
            .partitioned_mut()
            .ok_or_else(|| {
                MigrationError::UnexpectedModelKind {
                    app_label: app_label.to_string(),
                    model: model_name.to_string(),
                    expected: "partitioned",
                }
                .into()
            })
    }

    pub fn render_model(&self, app_label: &str, model_name: &str) -> Result<ModelDef> {
        self.require_model(app_label, model_name)
            .map(ModelState::render)
    }
}

fn missing_model(app_label: &str, model_name: &str) -> crate::Error {
    MigrationError::MissingModelState {
        app_label: app_label.to_string(),
        model: model_name.to_string(),
    }
    .into()
}
