use serde::{Deserialize, Serialize};

use super::{CreateModel, Deconstructed, Operation};
use crate::migrations::{ModelOptions, ModelStateKind, PartitionedModelState, ProjectState};
use crate::{FieldDef, PartitioningOptions, Result, SchemaEditor};

/// Creates the parent table of a partitioned model. Partitions are added by
/// separate operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePartitionedModel {
    pub name: String,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub options: ModelOptions,
    #[serde(default)]
    pub partitioning_options: PartitioningOptions,
}

impl CreatePartitionedModel {
    pub const NAME: &'static str = "CreatePartitionedModel";

    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldDef>,
        options: ModelOptions,
        partitioning_options: PartitioningOptions,
    ) -> Self {
        Self {
            name: name.into(),
            fields,
            options,
            partitioning_options,
        }
    }

    #[must_use]
    pub fn from_create_model(operation: CreateModel, partitioning_options: PartitioningOptions) -> Self {
        Self::new(
            operation.name,
            operation.fields,
            operation.options,
            partitioning_options,
        )
    }

    fn as_create_model(&self) -> CreateModel {
        CreateModel::new(self.name.clone(), self.fields.clone(), self.options.clone())
    }
}

impl Operation for CreatePartitionedModel {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        let kind = ModelStateKind::Partitioned(PartitionedModelState::new(
            self.partitioning_options.clone(),
        ));
        state.add_model(self.as_create_model().model_state(app_label, kind));
        Ok(())
    }

    fn state_backwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        state.remove_model(app_label, &self.name);
        Ok(())
    }

    fn database_forwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        editor.create_partitioned_model(&to_state.render_model(app_label, &self.name)?)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        editor.delete_partitioned_model(&from_state.render_model(app_label, &self.name)?)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Creates partitioned model {}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeletePartitionedModel {
    pub name: String,
}

impl DeletePartitionedModel {
    pub const NAME: &'static str = "DeletePartitionedModel";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Operation for DeletePartitionedModel {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        state.partitioned_model_mut(app_label, &self.name)?;
        state.remove_model(app_label, &self.name);
        Ok(())
    }

    fn database_forwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        editor.delete_partitioned_model(&from_state.render_model(app_label, &self.name)?)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        editor.create_partitioned_model(&to_state.render_model(app_label, &self.name)?)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Deletes partitioned model {}", self.name)
    }
}
