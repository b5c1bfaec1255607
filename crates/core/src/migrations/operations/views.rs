use serde::{Deserialize, Serialize};

use super::{CreateModel, Deconstructed, Operation};
use crate::migrations::{ModelOptions, ModelStateKind, ProjectState};
use crate::{FieldDef, MigrationError, Result, SchemaEditor, ViewOptions};

fn require_view_kind(
    state: &ProjectState,
    app_label: &str,
    name: &str,
    materialized: bool,
) -> Result<()> {
    let model = state.require_model(app_label, name)?;
    let matches = match model.kind {
        ModelStateKind::View(_) => !materialized,
        ModelStateKind::MaterializedView(_) => materialized,
        _ => false,
    };
    if matches {
        return Ok(());
    }

    Err(MigrationError::UnexpectedModelKind {
        app_label: app_label.to_string(),
        model: name.to_string(),
        expected: if materialized { "a materialized view" } else { "a view" },
    }
    .into())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateViewModel {
    pub name: String,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub options: ModelOptions,
    pub view_options: ViewOptions,
}

impl CreateViewModel {
    pub const NAME: &'static str = "CreateViewModel";

    #[must_use]
    pub fn from_create_model(operation: CreateModel, view_options: ViewOptions) -> Self {
        Self {
            name: operation.name,
            fields: operation.fields,
            options: operation.options,
            view_options,
        }
    }
}

impl Operation for CreateViewModel {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        let create = CreateModel::new(self.name.clone(), self.fields.clone(), self.options.clone());
        state.add_model(create.model_state(app_label, ModelStateKind::View(self.view_options.clone())));
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
        editor.create_view_model(&to_state.render_model(app_label, &self.name)?)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        editor.delete_view_model(&from_state.render_model(app_label, &self.name)?)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Creates view model {}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteViewModel {
    pub name: String,
}

impl DeleteViewModel {
    pub const NAME: &'static str = "DeleteViewModel";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Operation for DeleteViewModel {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        require_view_kind(state, app_label, &self.name, false)?;
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
        editor.delete_view_model(&from_state.render_model(app_label, &self.name)?)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        editor.create_view_model(&to_state.render_model(app_label, &self.name)?)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Deletes view model {}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMaterializedViewModel {
    pub name: String,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub options: ModelOptions,
    pub view_options: ViewOptions,
}

impl CreateMaterializedViewModel {
    pub const NAME: &'static str = "CreateMaterializedViewModel";

    #[must_use]
    pub fn from_create_model(operation: CreateModel, view_options: ViewOptions) -> Self {
        Self {
            name: operation.name,
            fields: operation.fields,
            options: operation.options,
            view_options,
        }
    }
}

impl Operation for CreateMaterializedViewModel {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        let create = CreateModel::new(self.name.clone(), self.fields.clone(), self.options.clone());
        state.add_model(create.model_state(
            app_label,
            ModelStateKind::MaterializedView(self.view_options.clone()),
        ));
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
        editor.create_materialized_view_model(&to_state.render_model(app_label, &self.name)?)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        editor.delete_materialized_view_model(&from_state.render_model(app_label, &self.name)?)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Creates materialized view model {}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteMaterializedViewModel {
    pub name: String,
}

impl DeleteMaterializedViewModel {
    pub const NAME: &'static str = "DeleteMaterializedViewModel";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Operation for DeleteMaterializedViewModel {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        require_view_kind(state, app_label, &self.name, true)?;
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
        editor.delete_materialized_view_model(&from_state.render_model(app_label, &self.name)?)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        editor.create_materialized_view_model(&to_state.render_model(app_label, &self.name)?)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Deletes materialized view model {}", self.name)
    }
}
