use std::collections::BTreeMap;

use tracing::debug;

use super::{
    AddField, AlterField, CreateModel, DeleteModel, ModelState, Operation, ProjectState,
    RemoveField,
};
use crate::Result;

/// A generic change the autodetector found, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposedOperation {
    CreateModel(CreateModel),
    DeleteModel(DeleteModel),
    AddField(AddField),
    RemoveField(RemoveField),
    AlterField(AlterField),
}

impl ProposedOperation {
    #[must_use]
    pub fn model_name(&self) -> &str {
        match self {
            Self::CreateModel(operation) => &operation.name,
            Self::DeleteModel(operation) => &operation.name,
            Self::AddField(operation) => &operation.model_name,
            Self::RemoveField(operation) => &operation.model_name,
            Self::AlterField(operation) => &operation.model_name,
        }
    }

    #[must_use]
    pub fn into_operation(self) -> Box<dyn Operation> {
        match self {
            Self::CreateModel(operation) => Box::new(operation),
            Self::DeleteModel(operation) => Box::new(operation),
            Self::AddField(operation) => Box::new(operation),
            Self::RemoveField(operation) => Box::new(operation),
            Self::AlterField(operation) => Box::new(operation),
        }
    }
}

/// Turns each proposed change into the operations written to a migration.
pub trait OperationClassifier {
    fn classify(
        &self,
        app_label: &str,
        proposal: ProposedOperation,
        from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<Vec<Box<dyn Operation>>>;
}

/// Keeps every proposal as the generic operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughClassifier;

impl OperationClassifier for PassthroughClassifier {
    fn classify(
        &self,
        _app_label: &str,
        proposal: ProposedOperation,
        _from_state: &ProjectState,
        _to_state: &ProjectState,
    ) -> Result<Vec<Box<dyn Operation>>> {
        Ok(vec![proposal.into_operation()])
    }
}

/// Diffs two project states into per-app operation lists.
#[derive(Debug)]
pub struct MigrationAutodetector<'a> {
    from_state: &'a ProjectState,
    to_state: &'a ProjectState,
}

impl<'a> MigrationAutodetector<'a> {
    #[must_use]
    pub const fn new(from_state: &'a ProjectState, to_state: &'a ProjectState) -> Self {
        Self {
            from_state,
            to_state,
        }
    }

    /// Generic proposals grouped by app label: model creations, then field
    /// changes, then model deletions.
    #[must_use]
    pub fn proposals(&self) -> BTreeMap<String, Vec<ProposedOperation>> {
        let mut proposals: BTreeMap<String, Vec<ProposedOperation>> = BTreeMap::new();

        for (key, model) in &self.to_state.models {
            if !self.from_state.models.contains_key(key) {
                proposals
                    .entry(key.app_label.clone())
                    .or_default()
                    .push(ProposedOperation::CreateModel(CreateModel::from_state(model)));
            }
        }

        for (key, new_model) in &self.to_state.models {
            if let Some(old_model) = self.from_state.models.get(key) {
                let field_changes = diff_fields(old_model, new_model);
                if !field_changes.is_empty() {
                    proposals
                        .entry(key.app_label.clone())
                        .or_default()
                        .extend(field_changes);
                }
            }
        }

        for (key, model) in &self.from_state.models {
            if !self.to_state.models.contains_key(key) {
                proposals
                    .entry(key.app_label.clone())
                    .or_default()
                    .push(ProposedOperation::DeleteModel(DeleteModel::new(model.name.clone())));
            }
        }

        proposals
    }

    pub fn changes(
        &self,
        classifier: &dyn OperationClassifier,
    ) -> Result<BTreeMap<String, Vec<Box<dyn Operation>>>> {
        let mut changes = BTreeMap::new();
        for (app_label, proposals) in self.proposals() {
            let mut operations = Vec::new();
            for proposal in proposals {
                debug!(app_label = %app_label, model = proposal.model_name(), "classifying proposed operation");
                operations.extend(classifier.classify(
                    &app_label,
                    proposal,
                    self.from_state,
                    self.to_state,
                )?);
            }
            changes.insert(app_label, operations);
        }
        Ok(changes)
    }
}

fn diff_fields(old_model: &ModelState, new_model: &ModelState) -> Vec<ProposedOperation> {
    let mut changes = Vec::new();

    for field in &new_model.fields {
        match old_model.field(&field.name) {
            None => changes.push(ProposedOperation::AddField(AddField::new(
                new_model.name.clone(),
                field.clone(),
            ))),
            Some(old_field) if old_field != field => {
                changes.push(ProposedOperation::AlterField(AlterField::new(
                    new_model.name.clone(),
                    field.name.clone(),
                    field.clone(),
                )));
            }
            Some(_) => {}
        }
    }

    for field in &old_model.fields {
        if new_model.field(&field.name).is_none() {
            changes.push(ProposedOperation::RemoveField(RemoveField::new(
                new_model.name.clone(),
                field.name.clone(),
            )));
        }
    }

    changes
}
