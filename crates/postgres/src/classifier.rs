use pgextra_core::{
    PartitioningMethod, Result,
    migrations::{
        AddDefaultPartition, ApplyState, CreateMaterializedViewModel, CreatePartitionedModel,
        CreateViewModel, DeleteMaterializedViewModel, DeletePartitionedModel, DeleteViewModel,
        ModelStateKind, Operation, OperationClassifier, ProjectState, ProposedOperation,
    },
};
use tracing::debug;

/// Name of the partition added alongside every new partitioned model.
pub const DEFAULT_PARTITION_NAME: &str = "default";

/// Swaps generic model operations for the partitioned and view specific
/// ones, based on the kind recorded in the project state.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresOperationClassifier;

impl OperationClassifier for PostgresOperationClassifier {
    fn classify(
        &self,
        app_label: &str,
        proposal: ProposedOperation,
        from_state: &ProjectState,
        to_state: &ProjectState,
    ) -> Result<Vec<Box<dyn Operation>>> {
        let kind_in = |state: &ProjectState| {
            state
                .get_model(app_label, proposal.model_name())
                .map(|model| model.kind.clone())
        };
        let to_kind = kind_in(to_state);
        let from_kind = kind_in(from_state);

        let operations: Vec<Box<dyn Operation>> = match (proposal, to_kind, from_kind) {
            (ProposedOperation::CreateModel(create), Some(ModelStateKind::Partitioned(state)), _) => {
                let model_name = create.name.clone();
                let options = state.partitioning_options;
                let method = options.method;

                let mut operations: Vec<Box<dyn Operation>> =
                    vec![Box::new(CreatePartitionedModel::from_create_model(create, options))];
                if method != PartitioningMethod::Hash {
                    operations.push(Box::new(AddDefaultPartition::new(model_name, DEFAULT_PARTITION_NAME)));
                }
                operations
            }
            (ProposedOperation::CreateModel(create), Some(ModelStateKind::View(view_options)), _) => {
                vec![Box::new(CreateViewModel::from_create_model(create, view_options))]
            }
            (ProposedOperation::CreateModel(create), Some(ModelStateKind::MaterializedView(view_options)), _) => {
                vec![Box::new(CreateMaterializedViewModel::from_create_model(create, view_options))]
            }
            (ProposedOperation::DeleteModel(delete), _, Some(ModelStateKind::Partitioned(_))) => {
                vec![Box::new(DeletePartitionedModel::new(delete.name))]
            }
            (ProposedOperation::DeleteModel(delete), _, Some(ModelStateKind::View(_))) => {
                vec![Box::new(DeleteViewModel::new(delete.name))]
            }
            (ProposedOperation::DeleteModel(delete), _, Some(ModelStateKind::MaterializedView(_))) => {
                vec![Box::new(DeleteMaterializedViewModel::new(delete.name))]
            }
            (
                proposal @ (ProposedOperation::AddField(_)
                | ProposedOperation::RemoveField(_)
                | ProposedOperation::AlterField(_)),
                to_kind,
                from_kind,
            ) if to_kind.as_ref().or(from_kind.as_ref()).is_some_and(ModelStateKind::is_view) => {
                debug!(
                    app_label,
                    model = proposal.model_name(),
                    "field change on a view only updates migration state"
                );
                vec![Box::new(ApplyState::boxed(proposal.into_operation()))]
            }
            (proposal, _, _) => vec![proposal.into_operation()],
        };

        Ok(operations)
    }
}
