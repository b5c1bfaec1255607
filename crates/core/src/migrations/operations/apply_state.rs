use serde::Deserialize;

use super::{Deconstructed, Operation};
use crate::migrations::ProjectState;
use crate::{MigrationError, Result, SchemaEditor};

/// Migrates the project state with the wrapped operation but leaves the
/// database untouched. Used for changes a view cannot express in DDL.
#[derive(Debug)]
pub struct ApplyState {
    pub state_operation: Box<dyn Operation>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ApplyStateKwargs {
    state_operation: Deconstructed,
}

impl ApplyState {
    pub const NAME: &'static str = "ApplyState";

    pub fn new(state_operation: impl Operation + 'static) -> Self {
        Self {
            state_operation: Box::new(state_operation),
        }
    }

    #[must_use]
    pub fn boxed(state_operation: Box<dyn Operation>) -> Self {
        Self { state_operation }
    }

    pub(super) fn from_kwargs(kwargs: &serde_json::Value) -> Result<Self> {
        let kwargs: ApplyStateKwargs =
            serde_json::from_value(kwargs.clone()).map_err(|source| MigrationError::Deconstruct {
                name: Self::NAME.to_string(),
                source,
            })?;
        Ok(Self::boxed(kwargs.state_operation.reconstruct()?))
    }
}

impl Operation for ApplyState {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        self.state_operation.state_forwards(app_label, state)
    }

    fn state_backwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        self.state_operation.state_backwards(app_label, state)
    }

    fn database_forwards(
        &self,
        _app_label: &str,
        _editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        Ok(())
    }

    fn database_backwards(
        &self,
        _app_label: &str,
        _editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        Ok(())
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        let inner = self.state_operation.deconstruct()?;
        Deconstructed::of(
            Self::NAME,
            &serde_json::json!({ "state_operation": inner }),
        )
    }

    fn describe(&self) -> String {
        format!("Apply state: {}", self.state_operation.describe())
    }
}
