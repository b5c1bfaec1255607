use serde::{Deserialize, Serialize};

use super::{Deconstructed, Operation};
use crate::migrations::{PartitionState, ProjectState};
use crate::{MigrationError, ModelDef, PartitioningError, Result, SchemaEditor, Value};

fn add_partition_state(
    app_label: &str,
    state: &mut ProjectState,
    model_name: &str,
    partition: PartitionState,
) -> Result<()> {
    state
        .partitioned_model_mut(app_label, model_name)?
        .add_partition(partition)
}

fn remove_partition_state(
    app_label: &str,
    state: &mut ProjectState,
    model_name: &str,
    name: &str,
) -> Result<PartitionState> {
    state
        .partitioned_model_mut(app_label, model_name)?
        .delete_partition(name)
        .ok_or_else(|| missing_partition(app_label, model_name, name))
}

fn missing_partition(app_label: &str, model_name: &str, name: &str) -> crate::Error {
    MigrationError::MissingPartitionState {
        app_label: app_label.to_string(),
        model: model_name.to_string(),
        partition: name.to_string(),
    }
    .into()
}

/// Creates a partition exactly as its migration state describes it.
fn recreate_partition(
    editor: &mut dyn SchemaEditor,
    model: &ModelDef,
    partition: &PartitionState,
) -> Result<()> {
    match partition {
        PartitionState::Range {
            name,
            from_values,
            to_values,
            ..
        } => editor.add_range_partition(model, name, from_values, to_values, None),
        PartitionState::List { name, values, .. } => {
            editor.add_list_partition(model, name, values, None)
        }
        PartitionState::Hash {
            name,
            modulus,
            remainder,
            ..
        } => editor.add_hash_partition(model, name, *modulus, *remainder, None),
        PartitionState::Default { name, .. } => editor.add_default_partition(model, name, None),
    }
}

/// Recreates a deleted partition from the state it had before deletion.
fn restore_partition(
    app_label: &str,
    editor: &mut dyn SchemaEditor,
    to_state: &ProjectState,
    model_name: &str,
    name: &str,
    expected_kind: Option<&'static str>,
) -> Result<()> {
    let model_state = to_state.require_model(app_label, model_name)?;
    let partition = model_state
        .partitioned()
        .and_then(|partitioned| partitioned.partition(name))
        .ok_or_else(|| missing_partition(app_label, model_name, name))?;

    if let Some(expected) = expected_kind
        && partition.kind() != expected
    {
        return Err(PartitioningError::InvalidPartitionState {
            model: model_name.to_string(),
            partition: name.to_string(),
            message: format!("expected a {expected} partition, found a {} partition", partition.kind()),
        }
        .into());
    }

    recreate_partition(editor, &model_state.render(), partition)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddRangePartition {
    pub model_name: String,
    pub name: String,
    pub from_values: Vec<Value>,
    pub to_values: Vec<Value>,
}

impl AddRangePartition {
    pub const NAME: &'static str = "AddRangePartition";

    pub fn new(
        model_name: impl Into<String>,
        name: impl Into<String>,
        from_values: Vec<Value>,
        to_values: Vec<Value>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            name: name.into(),
            from_values,
            to_values,
        }
    }
}

impl Operation for AddRangePartition {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        let partition = PartitionState::Range {
            app_label: app_label.to_string(),
            model_name: self.model_name.clone(),
            name: self.name.clone(),
            from_values: self.from_values.clone(),
            to_values: self.to_values.clone(),
        };
        add_partition_state(app_label, state, &self.model_name, partition)
    }

    fn state_backwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        remove_partition_state(app_label, state, &self.model_name, &self.name).map(drop)
    }

    fn database_forwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        let model = to_state.render_model(app_label, &self.model_name)?;
        editor.add_range_partition(&model, &self.name, &self.from_values, &self.to_values, None)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        let model = from_state.render_model(app_label, &self.model_name)?;
        editor.delete_partition(&model, &self.name)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Creates range partition {} on {}", self.name, self.model_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddListPartition {
    pub model_name: String,
    pub name: String,
    pub values: Vec<Value>,
}

impl AddListPartition {
    pub const NAME: &'static str = "AddListPartition";

    pub fn new(model_name: impl Into<String>, name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            model_name: model_name.into(),
            name: name.into(),
            values,
        }
    }
}

impl Operation for AddListPartition {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        let partition = PartitionState::List {
            app_label: app_label.to_string(),
            model_name: self.model_name.clone(),
            name: self.name.clone(),
            values: self.values.clone(),
        };
        add_partition_state(app_label, state, &self.model_name, partition)
    }

    fn state_backwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        remove_partition_state(app_label, state, &self.model_name, &self.name).map(drop)
    }

    fn database_forwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        let model = to_state.render_model(app_label, &self.model_name)?;
        editor.add_list_partition(&model, &self.name, &self.values, None)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        let model = from_state.render_model(app_label, &self.model_name)?;
        editor.delete_partition(&model, &self.name)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Creates list partition {} on {}", self.name, self.model_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddHashPartition {
    pub model_name: String,
    pub name: String,
    pub modulus: u32,
    pub remainder: u32,
}

impl AddHashPartition {
    pub const NAME: &'static str = "AddHashPartition";

    pub fn new(model_name: impl Into<String>, name: impl Into<String>, modulus: u32, remainder: u32) -> Self {
        Self {
            model_name: model_name.into(),
            name: name.into(),
            modulus,
            remainder,
        }
    }
}

impl Operation for AddHashPartition {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        let partition = PartitionState::Hash {
            app_label: app_label.to_string(),
            model_name: self.model_name.clone(),
            name: self.name.clone(),
            modulus: self.modulus,
            remainder: self.remainder,
        };
        add_partition_state(app_label, state, &self.model_name, partition)
    }

    fn state_backwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        remove_partition_state(app_label, state, &self.model_name, &self.name).map(drop)
    }

    fn database_forwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        let model = to_state.render_model(app_label, &self.model_name)?;
        editor.add_hash_partition(&model, &self.name, self.modulus, self.remainder, None)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        let model = from_state.render_model(app_label, &self.model_name)?;
        editor.delete_partition(&model, &self.name)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Creates hash partition {} on {}", self.name, self.model_name)
    }
}

/// Catches rows that fit no other partition of a range or list table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddDefaultPartition {
    pub model_name: String,
    pub name: String,
}

impl AddDefaultPartition {
    pub const NAME: &'static str = "AddDefaultPartition";

    pub fn new(model_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            name: name.into(),
        }
    }
}

impl Operation for AddDefaultPartition {
    fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        let partition = PartitionState::Default {
            app_label: app_label.to_string(),
            model_name: self.model_name.clone(),
            name: self.name.clone(),
        };
        add_partition_state(app_label, state, &self.model_name, partition)
    }

    fn state_backwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
        remove_partition_state(app_label, state, &self.model_name, &self.name).map(drop)
    }

    fn database_forwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        _from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<()> {
        let model = to_state.render_model(app_label, &self.model_name)?;
        editor.add_default_partition(&model, &self.name, None)
    }

    fn database_backwards(
        &self,
        app_label: &str,
        editor: &mut dyn SchemaEditor,
        from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<()> {
        let model = from_state.render_model(app_label, &self.model_name)?;
        editor.delete_partition(&model, &self.name)
    }

    fn deconstruct(&self) -> Result<Deconstructed> {
        Deconstructed::of(Self::NAME, self)
    }

    fn describe(&self) -> String {
        format!("Creates default partition '{}' on {}", self.name, self.model_name)
    }
}

macro_rules! delete_partition_operation {
    ($(#[$meta:meta])* $ty:ident, $kind:expr, $description:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $ty {
            pub model_name: String,
            pub name: String,
        }

        impl $ty {
            pub const NAME: &'static str = stringify!($ty);

            pub fn new(model_name: impl Into<String>, name: impl Into<String>) -> Self {
                Self {
                    model_name: model_name.into(),
                    name: name.into(),
                }
            }
        }

        impl Operation for $ty {
            fn state_forwards(&self, app_label: &str, state: &mut ProjectState) -> Result<()> {
                remove_partition_state(app_label, state, &self.model_name, &self.name).map(drop)
            }

            fn database_forwards(
                &self,
                app_label: &str,
                editor: &mut dyn SchemaEditor,
                from_state: &ProjectState,
                _to_state: &ProjectState,
            ) -> Result<()> {
                let model = from_state.render_model(app_label, &self.model_name)?;
                editor.delete_partition(&model, &self.name)
            }

            fn database_backwards(
                &self,
                app_label: &str,
                editor: &mut dyn SchemaEditor,
                _from_state: &ProjectState,
                to_state: &ProjectState,
            ) -> Result<()> {
                restore_partition(app_label, editor, to_state, &self.model_name, &self.name, $kind)
            }

            fn deconstruct(&self) -> Result<Deconstructed> {
                Deconstructed::of(Self::NAME, self)
            }

            fn describe(&self) -> String {
                format!($description, self.name, self.model_name)
            }
        }
    };
}

delete_partition_operation!(
    /// Deletes a partition of any kind. Reversing recreates whatever kind the
    /// migration state recorded.
    DeletePartition,
    None,
    "Deletes partition {} on {}"
);
delete_partition_operation!(DeleteRangePartition, Some("range"), "Deletes range partition '{}' on {}");
delete_partition_operation!(DeleteListPartition, Some("list"), "Deletes list partition '{}' on {}");
delete_partition_operation!(DeleteHashPartition, Some("hash"), "Deletes hash partition '{}' on {}");
delete_partition_operation!(
    DeleteDefaultPartition,
    Some("default"),
    "Deletes default partition '{}' on {}"
);
