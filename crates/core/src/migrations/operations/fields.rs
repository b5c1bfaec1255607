use serde::{Deserialize, Serialize};

use super::{Deconstructed, Operation};
use crate::migrations::{ModelState, ProjectState};
use crate::{ConfigError, FieldDef, Result, SchemaEditor};

fn require_field<'a>(model: &'a ModelState, name: &str) -> Result<&'a FieldDef> {
    model.field(name).ok_or_else(|| {
        ConfigError::improperly_configured(
            &model.name,
            format!("field `{name}` does not exist in migration state"),
        )
        .into()
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddField {
    pub model_name: String,
    pub field: FieldDef,
}

impl AddField {
    pub const NAME: &'static str = "AddField";

    pub fn new(model_name: impl Into<String>, field: FieldDef) -> Self {
        Self {
            model_name: model_name.into(),
            field,
        }
    }
}

impl Operation for AddField {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        let model = state.require_model_mut(app_label, &self.model_name)?;
        model.fields.retain(|field| field.name != self.field.name);
        model.fields.push(self.field.clone());
        Ok(())
    }

    fn state_backwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        let model = state.require_model_mut(app_label, &self.model_name)?;
        model.fields.retain(|field| field.name != self.field.name);
        Ok(())
    }

    fn database_forwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        let model = to_state.require_model(app_label, &self.model_name)?;
        let field = require_field(model, &self.field.name)?;
        editor.add_field(&model.render(), field)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        let model = from_state.require_model(app_label, &self.model_name)?;
        let field = require_field(model, &self.field.name)?;
        editor.remove_field(&model.render(), field)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Adds field {} to {}", self.field.name, self.model_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveField {
    pub model_name: String,
    pub name: String,
}

impl RemoveField {
    pub const NAME: &'static str = "RemoveField";

    pub fn new(model_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            name: name.into(),
        }
    }
}

impl Operation for RemoveField {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        let model = state.require_model_mut(app_label, &self.model_name)?;
        require_field(model, &self.name)?;
        model.fields.retain(|field| field.name != self.name);
        Ok(())
    }

    fn database_forwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        let model = from_state.require_model(app_label, &self.model_name)?;
        let field = require_field(model, &self.name)?;
        editor.remove_field(&model.render(), field)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        let model = to_state.require_model(app_label, &self.model_name)?;
        let field = require_field(model, &self.name)?;
        editor.add_field(&model.render(), field)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Removes field {} from {}", self.name, self.model_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlterField {
    pub model_name: String,
    pub name: String,
    pub field: FieldDef,
}

impl AlterField {
    pub const NAME: &'static str = "AlterField";

    pub fn new(model_name: impl Into<String>, name: impl Into<String>, field: FieldDef) -> Self {
        Self {
            model_name: model_name.into(),
            name: name.into(),
            field,
        }
    }
}

impl Operation for AlterField {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        let model = state.require_model_mut(app_label, &self.model_name)?;
        let position = model
            .fields
            .iter()
            .position(|field| field.name == self.name);
        match position {
            Some(index) => model.fields[index] = self.field.clone(),
            None => {
                require_field(model, &self.name)?;
            }
        }
        Ok(())
    }

    fn database_forwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        let from_model = from_state.require_model(app_label, &self.model_name)?;
        let to_model = to_state.require_model(app_label, &self.model_name)?;
        let old_field = require_field(from_model, &self.name)?;
        let new_field = require_field(to_model, &self.field.name)?;
        editor.alter_field(&to_model.render(), old_field, new_field)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        let from_model = from_state.require_model(app_label, &self.model_name)?;
        let to_model = to_state.require_model(app_label, &self.model_name)?;
        let current_field = require_field(from_model, &self.field.name)?;
        let restored_field = require_field(to_model, &self.name)?;
        editor.alter_field(&to_model.render(), current_field, restored_field)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Alters field {} on {}", self.name, self.model_name)
    }
}
