mod apply_state;
mod fields;
mod models;
mod partitioned;
mod partitions;
mod views;

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub use apply_state::ApplyState;
pub use fields::{AddField, AlterField, RemoveField};
pub use models::{CreateModel, DeleteModel};
pub use partitioned::{CreatePartitionedModel, DeletePartitionedModel};
pub use partitions::{
    AddDefaultPartition, AddHashPartition, AddListPartition, AddRangePartition,
    DeleteDefaultPartition, DeleteHashPartition, DeleteListPartition, DeletePartition,
    DeleteRangePartition,
};
pub use views::{
    CreateMaterializedViewModel, CreateViewModel, DeleteMaterializedViewModel, DeleteViewModel,
};

use super::ProjectState;
use crate::{MigrationError, Result, SchemaEditor};

/// One step of a migration.
///
/// `database_forwards` receives the state before (`from_state`) and after
/// (`to_state`) the operation. `database_backwards` receives them the other
/// way around: `from_state` has the operation applied, `to_state` does not.
pub trait Operation: fmt::Debug {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()>;

    /// Undoes `state_forwards` where that is possible without history.
    fn state_backwards(&self, _app_label: &str, _state: &mut ProjectState) -> Result<()> {
        Ok(())
    }

    fn database_forwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()>;

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()>;

    fn deconstruct(&self) -> Result<Deconstructed>;

    fn describe(&self) -> String;
}

/// Serialized form of an operation as written into migration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deconstructed {
    pub name: String,
    #[serde(default)]
    pub kwargs: serde_json::Value,
}

impl Deconstructed {
    pub fn of<T: Serialize>(name: &str, operation: &T) -> Result<Self> {
        let kwargs = serde_json::to_value(operation).map_err(|source| MigrationError::Deconstruct {
            name: name.to_string(),
            source,
        })?;

        Ok(Self {
            name: name.to_string(),
            kwargs,
        })
    }

    /// Rebuilds the operation this was deconstructed from.
    pub fn reconstruct(&self) -> Result<Box<dyn Operation>> {
        match self.name.as_str() {
            CreateModel::NAME => self.parse::<CreateModel>(),
            DeleteModel::NAME => self.parse::<DeleteModel>(),
            AddField::NAME => self.parse::<AddField>(),
            RemoveField::NAME => self.parse::<RemoveField>(),
            AlterField::NAME => self.parse::<AlterField>(),
            CreatePartitionedModel::NAME => self.parse::<CreatePartitionedModel>(),
            DeletePartitionedModel::NAME => self.parse::<DeletePartitionedModel>(),
            AddRangePartition::NAME => self.parse::<AddRangePartition>(),
            AddListPartition::NAME => self.parse::<AddListPartition>(),
            AddHashPartition::NAME => self.parse::<AddHashPartition>(),
            AddDefaultPartition::NAME => self.parse::<AddDefaultPartition>(),
            DeletePartition::NAME => self.parse::<DeletePartition>(),
            DeleteRangePartition::NAME => self.parse::<DeleteRangePartition>(),
            DeleteListPartition::NAME => self.parse::<DeleteListPartition>(),
            DeleteHashPartition::NAME => self.parse::<DeleteHashPartition>(),
            DeleteDefaultPartition::NAME => self.parse::<DeleteDefaultPartition>(),
            CreateViewModel::NAME => self.parse::<CreateViewModel>(),
            DeleteViewModel::NAME => self.parse::<DeleteViewModel>(),
            CreateMaterializedViewModel::NAME => self.parse::<CreateMaterializedViewModel>(),
            DeleteMaterializedViewModel::NAME => self.parse::<DeleteMaterializedViewModel>(),
            ApplyState::NAME => ApplyState::from_kwargs(&self.kwargs)
                .map(|operation| Box::new(operation) as Box<dyn Operation>),
            other => Err(MigrationError::UnknownOperation {
                name: other.to_string(),
            }
            .into()),
        }
    }

    fn parse<T>(&self) -> Result<Box<dyn Operation>>
    where
        T: Operation + DeserializeOwned + 'static,
    {
        let operation: T =
            serde_json::from_value(self.kwargs.clone()).map_err(|source| MigrationError::Deconstruct {
                name: self.name.clone(),
                source,
            })?;
        Ok(Box::new(operation))
    }
}
