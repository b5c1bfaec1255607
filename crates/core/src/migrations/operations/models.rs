use serde::{Deserialize, Serialize};

use super::{Deconstructed, Operation};
use crate::migrations::{ModelOptions, ModelState, ModelStateKind, ProjectState};
use crate::{FieldDef, Result, SchemaEditor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateModel {
    pub name: String,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub options: ModelOptions,
}

impl CreateModel {
    pub const NAME: &'static str = "CreateModel";

    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>, options: ModelOptions) -> Self {
        Self {
            name: name.into(),
            fields,
            options,
        }
    }

    #[must_use]
    pub fn from_state(model: &ModelState) -> Self {
        Self::new(model.name.clone(), model.fields.clone(), model.options.clone())
    }

    pub(crate) fn model_state(&self, app_label: &str, kind: ModelStateKind) -> ModelState {
        ModelState::new(
            app_label,
            self.name.clone(),
            self.fields.clone(),
            self.options.clone(),
            kind,
        )
    }
}

impl Operation for CreateModel {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        state.add_model(self.model_state(app_label, ModelStateKind::Plain));
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
        editor.create_model(&to_state.render_model(app_label, &self.name)?)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        editor.delete_model(&from_state.render_model(app_label, &self.name)?)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Creates model {}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteModel {
    pub name: String,
}

impl DeleteModel {
    pub const NAME: &'static str = "DeleteModel";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Operation for DeleteModel {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        state.require_model(app_label, &self.name)?;
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
        editor.delete_model(&from_state.render_model(app_label, &self.name)?)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        editor.create_model(&to_state.render_model(app_label, &self.name)?)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Deletes model {}", self.name)
    }
}
